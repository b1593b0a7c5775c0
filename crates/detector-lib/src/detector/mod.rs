//! Symptom detectors
//!
//! A detector turns the measurements of the current checkpoint into zero or
//! more symptoms. Detectors keep no state between checkpoints: any history
//! they need comes from the execution context.

mod threshold;


pub use threshold::{
    ThresholdDetector, ThresholdDirection, ABOVE_THRESHOLD_NO_CHECKPOINTS,
    BELOW_THRESHOLD_NO_CHECKPOINTS, HIGH_THRESHOLD_CONF, LOW_THRESHOLD_CONF, SYMPTOM_HIGH,
    SYMPTOM_LOW,
};

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::models::{Measurement, Symptom};

/// Contract between the policy executor and a detector
pub trait Detector: Send + Sync {
    /// Resolve static configuration; must succeed exactly once before `detect`
    fn initialize(&mut self, ctx: &dyn ExecutionContext) -> Result<()>;

    /// Evaluate the measurements collected for the current checkpoint
    fn detect(&self, ctx: &dyn ExecutionContext, current: &[Measurement]) -> Result<Vec<Symptom>>;

    /// Symptom types this detector can emit
    fn symptom_types(&self) -> Vec<String>;
}
