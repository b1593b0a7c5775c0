//! Symptom detection library for checkpointed instance measurements
//!
//! This crate provides the core functionality for:
//! - Immutable measurement and symptom tables indexed by type and instance
//! - Threshold detectors that require a violation to persist across checkpoints
//! - Composite-key policy configuration
//! - Structured logging and Prometheus metrics for detection

pub mod config;
pub mod context;
pub mod detector;
pub mod error;
pub mod models;
pub mod naming;
pub mod observability;
pub mod table;

pub use config::{PolicyConfig, ThresholdSettings};
pub use context::{CheckpointContext, ExecutionContext};
pub use detector::{Detector, ThresholdDetector, ThresholdDirection};
pub use error::DetectorError;
pub use models::*;
pub use naming::{composite_name, split_composite_name};
pub use observability::{DetectorMetrics, StructuredLogger};
pub use table::{IndexedTable, MeasurementsTable, SymptomsTable, TableEntry, TypeView};
