//! Policy configuration
//!
//! Detector settings are stored under composite keys (`<PREFIX>:<metric>`)
//! so several detectors can share one policy configuration. Values are
//! `config::Value`, which lets callers feed the map from any `config` source.
//! Keys are matched case-insensitively because `config` sources lowercase
//! them.

use std::collections::HashMap;

use config::Value;

use crate::detector::ThresholdDirection;
use crate::error::{DetectorError, Result};
use crate::naming::composite_name;

/// Largest persistence window accepted from configuration
const MAX_REQUIRED_CHECKPOINTS: f64 = u32::MAX as f64;

/// Composite-key configuration map for one policy
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    policy: Option<String>,
    values: HashMap<String, Value>,
}

impl PolicyConfig {
    /// Create an empty configuration for a named policy
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            policy: Some(policy.into()),
            values: HashMap::new(),
        }
    }

    pub fn from_map(policy: impl Into<String>, values: HashMap<String, Value>) -> Self {
        Self {
            policy: Some(policy.into()),
            values: values
                .into_iter()
                .map(|(key, value)| (normalize_key(&key), value))
                .collect(),
        }
    }

    /// Adopt the root table of a `config` configuration
    pub fn from_config(policy: impl Into<String>, source: &config::Config) -> Result<Self> {
        let values: HashMap<String, Value> = source.clone().try_deserialize()?;
        Ok(Self::from_map(policy, values))
    }

    /// Set a value under an already composed key
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key: String = key.into();
        self.values.insert(normalize_key(&key), value.into());
        self
    }

    /// Set a value under `prefix:name`
    pub fn with_composite(self, prefix: &str, name: &str, value: impl Into<Value>) -> Self {
        self.with(composite_name(prefix, name), value)
    }

    pub fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&normalize_key(key))
    }

    /// Threshold configured for a metric in the given direction
    pub fn threshold(&self, direction: ThresholdDirection, metric: &str) -> Result<f64> {
        let key = composite_name(direction.threshold_key_prefix(), metric);
        let threshold = self.float(&key)?;
        if !threshold.is_finite() {
            return Err(DetectorError::invalid_config(key, "threshold must be finite"));
        }
        Ok(threshold)
    }

    pub fn low_threshold(&self, metric: &str) -> Result<f64> {
        self.threshold(ThresholdDirection::Below, metric)
    }

    pub fn high_threshold(&self, metric: &str) -> Result<f64> {
        self.threshold(ThresholdDirection::Above, metric)
    }

    /// Number of consecutive violating checkpoints required for a metric
    ///
    /// Accepts integers, floats without a fractional part and numeric strings.
    pub fn required_checkpoints(
        &self,
        direction: ThresholdDirection,
        metric: &str,
    ) -> Result<usize> {
        let key = composite_name(direction.checkpoints_key_prefix(), metric);
        let count = self.float(&key)?;

        if !count.is_finite() || count.fract() != 0.0 {
            return Err(DetectorError::invalid_config(
                key,
                format!("checkpoint count must be a whole number, got {count}"),
            ));
        }
        if !(1.0..=MAX_REQUIRED_CHECKPOINTS).contains(&count) {
            return Err(DetectorError::invalid_config(
                key,
                format!(
                    "checkpoint count must be between 1 and {MAX_REQUIRED_CHECKPOINTS}, got {count}"
                ),
            ));
        }

        Ok(count as usize)
    }

    fn float(&self, key: &str) -> Result<f64> {
        let value = self
            .get(key)
            .ok_or_else(|| DetectorError::MissingConfig {
                key: key.to_string(),
            })?;

        value
            .clone()
            .into_float()
            .map_err(|e| DetectorError::invalid_config(key, e.to_string()))
    }
}

fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

/// Threshold detector settings, validated once at initialization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSettings {
    pub threshold: f64,
    pub required_checkpoints: usize,
}

impl ThresholdSettings {
    pub fn resolve(
        config: &PolicyConfig,
        direction: ThresholdDirection,
        metric: &str,
    ) -> Result<Self> {
        Ok(Self {
            threshold: config.threshold(direction, metric)?,
            required_checkpoints: config.required_checkpoints(direction, metric)?,
        })
    }
}
