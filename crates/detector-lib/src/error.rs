//! Error taxonomy for the detection core
//!
//! Only construction, configuration and sequencing problems are errors.
//! Missing data (no history, unknown instance, unknown type) is a normal
//! outcome and never surfaces here.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by measurements, configuration and detectors
#[derive(Debug, Error)]
pub enum DetectorError {
    /// A measurement could not be constructed
    #[error("invalid measurement: {reason}")]
    InvalidMeasurement { reason: String },

    /// A required configuration key is absent
    #[error("missing configuration key `{key}`")]
    MissingConfig { key: String },

    /// A configuration key is present but its value is unusable
    #[error("invalid value for configuration key `{key}`: {reason}")]
    InvalidConfig { key: String, reason: String },

    /// The underlying configuration source failed
    #[error("configuration source error: {0}")]
    Config(#[from] config::ConfigError),

    /// `detect` was called before a successful `initialize`
    #[error("detector `{detector}` used before successful initialization")]
    NotInitialized { detector: String },

    /// `initialize` was called more than once
    #[error("detector `{detector}` already initialized")]
    AlreadyInitialized { detector: String },

    /// A checkpoint older than the current one was supplied
    #[error("checkpoint {requested} precedes current checkpoint {current}")]
    CheckpointOrder {
        current: DateTime<Utc>,
        requested: DateTime<Utc>,
    },
}

impl DetectorError {
    pub(crate) fn invalid_measurement(reason: impl Into<String>) -> Self {
        Self::InvalidMeasurement {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by static configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingConfig { .. } | Self::InvalidConfig { .. } | Self::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DetectorError>;
