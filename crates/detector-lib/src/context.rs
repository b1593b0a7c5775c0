//! Execution context handed to detectors by the policy executor
//!
//! The context supplies the current checkpoint and the measurements retained
//! across checkpoints. Detectors only read from it.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{DetectorError, Result};
use crate::models::Measurement;
use crate::table::MeasurementsTable;

/// Read-only view of the executor state during one detection pass
pub trait ExecutionContext: Send + Sync {
    /// Timestamp of the checkpoint being evaluated
    fn checkpoint(&self) -> DateTime<Utc>;

    /// All retained measurements up to and including the current checkpoint
    fn measurements(&self) -> &MeasurementsTable;
}

/// Context that accumulates measurement history across checkpoints
///
/// Every [`advance`](Self::advance) rebuilds the measurements table from the
/// retained history; the previous table is never modified.
#[derive(Debug, Clone)]
pub struct CheckpointContext {
    checkpoint: DateTime<Utc>,
    history: Vec<Measurement>,
    table: MeasurementsTable,
    retention: Option<Duration>,
}

impl Default for CheckpointContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckpointContext {
    pub fn new() -> Self {
        Self {
            checkpoint: DateTime::<Utc>::UNIX_EPOCH,
            history: Vec::new(),
            table: MeasurementsTable::default(),
            retention: None,
        }
    }

    /// Keep only measurements younger than `retention` relative to the checkpoint
    ///
    /// A retention reaching past the representable time range keeps everything.
    pub fn with_retention(mut self, retention: Duration) -> Result<Self> {
        if retention < Duration::zero() {
            return Err(DetectorError::invalid_config(
                "retention",
                format!("retention must not be negative, got {retention}"),
            ));
        }
        self.retention = Some(retention);
        Ok(self)
    }

    /// Move to a new checkpoint, recording the measurements collected for it
    ///
    /// The checkpoint may repeat the current one (late measurements) but must
    /// not go backwards.
    pub fn advance<I>(&mut self, checkpoint: DateTime<Utc>, measurements: I) -> Result<()>
    where
        I: IntoIterator<Item = Measurement>,
    {
        if checkpoint < self.checkpoint {
            return Err(DetectorError::CheckpointOrder {
                current: self.checkpoint,
                requested: checkpoint,
            });
        }

        self.checkpoint = checkpoint;
        self.history.extend(measurements);

        if let Some(cutoff) = self
            .retention
            .and_then(|retention| checkpoint.checked_sub_signed(retention))
        {
            self.history.retain(|m| m.timestamp() >= cutoff);
        }

        self.table = MeasurementsTable::of(self.history.iter().cloned());

        debug!(
            event = "checkpoint_advanced",
            checkpoint = %self.checkpoint,
            retained = self.table.size(),
            "Checkpoint advanced"
        );

        Ok(())
    }
}

impl ExecutionContext for CheckpointContext {
    fn checkpoint(&self) -> DateTime<Utc> {
        self.checkpoint
    }

    fn measurements(&self) -> &MeasurementsTable {
        &self.table
    }
}
