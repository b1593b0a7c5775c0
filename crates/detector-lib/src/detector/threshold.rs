//! Threshold detection with persistence
//!
//! Flags an instance when its metric has stayed strictly on the violating side
//! of a threshold for the last `required_checkpoints` checkpoints. Requiring
//! more than one checkpoint filters out single noisy samples.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use tracing::debug;

use super::Detector;
use crate::config::{PolicyConfig, ThresholdSettings};
use crate::context::ExecutionContext;
use crate::error::{DetectorError, Result};
use crate::models::{Measurement, Symptom};
use crate::naming::composite_name;
use crate::observability::{DetectorMetrics, StructuredLogger};

/// Key prefix of the low threshold for a metric
pub const LOW_THRESHOLD_CONF: &str = "LOW_THRESHOLD";
/// Key prefix of the checkpoint count for below-threshold detection
pub const BELOW_THRESHOLD_NO_CHECKPOINTS: &str = "BELOW_THRESHOLD_NO_CHECKPOINTS";
/// Symptom type prefix for below-threshold findings
pub const SYMPTOM_LOW: &str = "SYMPTOM_LOW";

/// Key prefix of the high threshold for a metric
pub const HIGH_THRESHOLD_CONF: &str = "HIGH_THRESHOLD";
/// Key prefix of the checkpoint count for above-threshold detection
pub const ABOVE_THRESHOLD_NO_CHECKPOINTS: &str = "ABOVE_THRESHOLD_NO_CHECKPOINTS";
/// Symptom type prefix for above-threshold findings
pub const SYMPTOM_HIGH: &str = "SYMPTOM_HIGH";

/// Side of the threshold that counts as a violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdDirection {
    /// Values strictly below the threshold violate
    Below,
    /// Values strictly above the threshold violate
    Above,
}

impl ThresholdDirection {
    pub fn threshold_key_prefix(self) -> &'static str {
        match self {
            ThresholdDirection::Below => LOW_THRESHOLD_CONF,
            ThresholdDirection::Above => HIGH_THRESHOLD_CONF,
        }
    }

    pub fn checkpoints_key_prefix(self) -> &'static str {
        match self {
            ThresholdDirection::Below => BELOW_THRESHOLD_NO_CHECKPOINTS,
            ThresholdDirection::Above => ABOVE_THRESHOLD_NO_CHECKPOINTS,
        }
    }

    pub fn symptom_prefix(self) -> &'static str {
        match self {
            ThresholdDirection::Below => SYMPTOM_LOW,
            ThresholdDirection::Above => SYMPTOM_HIGH,
        }
    }

    /// Strict comparison; a value equal to the threshold never violates
    pub fn violates(self, value: f64, threshold: f64) -> bool {
        match self {
            ThresholdDirection::Below => value < threshold,
            ThresholdDirection::Above => value > threshold,
        }
    }
}

impl fmt::Display for ThresholdDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdDirection::Below => write!(f, "below_threshold"),
            ThresholdDirection::Above => write!(f, "above_threshold"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DetectorState {
    Uninitialized,
    Ready(ThresholdSettings),
    /// Initialization failed; the detector stays unusable
    Failed,
}

/// Detects a metric persistently crossing a threshold, per instance
pub struct ThresholdDetector {
    direction: ThresholdDirection,
    metric: String,
    config: PolicyConfig,
    state: DetectorState,
    logger: StructuredLogger,
    metrics: DetectorMetrics,
}

impl ThresholdDetector {
    pub fn new(
        direction: ThresholdDirection,
        config: PolicyConfig,
        metric: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            metric: metric.into(),
            config,
            state: DetectorState::Uninitialized,
            logger: StructuredLogger::new(direction.to_string()),
            metrics: DetectorMetrics::new(),
        }
    }

    /// Detector raising `SYMPTOM_LOW:<metric>`
    pub fn below(config: PolicyConfig, metric: impl Into<String>) -> Self {
        Self::new(ThresholdDirection::Below, config, metric)
    }

    /// Detector raising `SYMPTOM_HIGH:<metric>`
    pub fn above(config: PolicyConfig, metric: impl Into<String>) -> Self {
        Self::new(ThresholdDirection::Above, config, metric)
    }

    pub fn direction(&self) -> ThresholdDirection {
        self.direction
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn symptom_type(&self) -> String {
        composite_name(self.direction.symptom_prefix(), &self.metric)
    }

    /// Resolved settings, once initialized
    pub fn settings(&self) -> Option<ThresholdSettings> {
        match self.state {
            DetectorState::Ready(settings) => Some(settings),
            _ => None,
        }
    }

    fn require_settings(&self) -> Result<ThresholdSettings> {
        self.settings().ok_or_else(|| DetectorError::NotInitialized {
            detector: self.symptom_type(),
        })
    }

    /// Latest current measurement of this detector's metric, per instance
    fn current_by_instance<'a>(
        &self,
        current: &'a [Measurement],
    ) -> BTreeMap<&'a str, &'a Measurement> {
        let mut latest: BTreeMap<&str, &Measurement> = BTreeMap::new();
        for m in current.iter().filter(|m| m.metric() == self.metric) {
            latest
                .entry(m.instance())
                .and_modify(|seen| {
                    if m.timestamp() >= seen.timestamp() {
                        *seen = m;
                    }
                })
                .or_insert(m);
        }
        latest
    }
}

impl Detector for ThresholdDetector {
    fn initialize(&mut self, ctx: &dyn ExecutionContext) -> Result<()> {
        if !matches!(self.state, DetectorState::Uninitialized) {
            return Err(DetectorError::AlreadyInitialized {
                detector: self.symptom_type(),
            });
        }

        match ThresholdSettings::resolve(&self.config, self.direction, &self.metric) {
            Ok(settings) => {
                self.logger.log_initialized(
                    &self.metric,
                    settings.threshold,
                    settings.required_checkpoints,
                );
                debug!(
                    checkpoint = %ctx.checkpoint(),
                    policy = ?self.config.policy(),
                    "Detector bound to context"
                );
                self.state = DetectorState::Ready(settings);
                Ok(())
            }
            Err(e) => {
                self.state = DetectorState::Failed;
                Err(e)
            }
        }
    }

    fn detect(&self, ctx: &dyn ExecutionContext, current: &[Measurement]) -> Result<Vec<Symptom>> {
        let settings = self.require_settings()?;
        let start = Instant::now();

        let checkpoint = ctx.checkpoint();
        let history = ctx.measurements().of_type(&self.metric);
        let required = settings.required_checkpoints;
        let symptom_type = self.symptom_type();
        let mut symptoms = Vec::new();

        for (instance, latest) in self.current_by_instance(current) {
            self.metrics.inc_instances_evaluated();

            // The latest current value closes the window; history supplies the
            // checkpoints strictly before it, whether or not it holds the current one
            let entries = history.instance_until(instance, checkpoint);
            let end = entries.partition_point(|m| m.timestamp() < latest.timestamp());
            let preceding = &entries[..end];
            let needed = required - 1;
            if preceding.len() < needed {
                self.logger
                    .log_insufficient_history(instance, preceding.len() + 1, required);
                self.metrics.inc_insufficient_history();
                continue;
            }
            let window = &preceding[preceding.len() - needed..];

            let persistent = window
                .iter()
                .chain(std::iter::once(latest))
                .all(|m| self.direction.violates(m.value(), settings.threshold));
            if !persistent {
                continue;
            }

            let assignment = window.iter().chain(std::iter::once(latest)).cloned().collect();
            let symptom = Symptom::new(symptom_type.clone(), instance, checkpoint, assignment);
            self.logger.log_symptom(&symptom);
            self.metrics.inc_symptoms_raised(&symptom_type);
            symptoms.push(symptom);
        }

        self.metrics
            .observe_detection_latency(start.elapsed().as_secs_f64());

        Ok(symptoms)
    }

    fn symptom_types(&self) -> Vec<String> {
        vec![self.symptom_type()]
    }
}
