//! Core data models for the detection core

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, Result};

/// One observation of one metric for one component instance
///
/// Two measurements are equal when they share the identity key
/// `(instance, metric, timestamp)`; component and value do not take part.
/// Deserialization goes through [`Measurement::new`], so a decoded
/// measurement is held to the same checks as a constructed one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawMeasurement")]
pub struct Measurement {
    component: String,
    instance: String,
    metric: String,
    timestamp: DateTime<Utc>,
    value: f64,
}

/// Wire shape of a measurement before validation
#[derive(Deserialize)]
struct RawMeasurement {
    component: String,
    instance: String,
    metric: String,
    timestamp: DateTime<Utc>,
    value: f64,
}

impl TryFrom<RawMeasurement> for Measurement {
    type Error = DetectorError;

    fn try_from(raw: RawMeasurement) -> Result<Self> {
        Self::new(raw.component, raw.instance, raw.metric, raw.timestamp, raw.value)
    }
}

/// Identity of a measurement: (instance, metric, timestamp)
pub type MeasurementKey<'a> = (&'a str, &'a str, DateTime<Utc>);

impl Measurement {
    /// Create a measurement, rejecting non-finite values
    pub fn new(
        component: impl Into<String>,
        instance: impl Into<String>,
        metric: impl Into<String>,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<Self> {
        if !value.is_finite() {
            return Err(DetectorError::invalid_measurement(format!(
                "value must be finite, got {value}"
            )));
        }

        Ok(Self {
            component: component.into(),
            instance: instance.into(),
            metric: metric.into(),
            timestamp,
            value,
        })
    }

    /// Create a measurement from a Unix timestamp in milliseconds
    pub fn from_unix_millis(
        component: impl Into<String>,
        instance: impl Into<String>,
        metric: impl Into<String>,
        timestamp_millis: i64,
        value: f64,
    ) -> Result<Self> {
        let timestamp = DateTime::from_timestamp_millis(timestamp_millis).ok_or_else(|| {
            DetectorError::invalid_measurement(format!(
                "timestamp {timestamp_millis}ms is out of range"
            ))
        })?;
        Self::new(component, instance, metric, timestamp, value)
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn identity(&self) -> MeasurementKey<'_> {
        (&self.instance, &self.metric, self.timestamp)
    }
}

impl PartialEq for Measurement {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Measurement {}

impl Hash for Measurement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// A named finding about one instance, backed by the measurements that caused it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symptom {
    symptom_type: String,
    instance: String,
    timestamp: DateTime<Utc>,
    assignment: Vec<Measurement>,
}

impl Symptom {
    pub fn new(
        symptom_type: impl Into<String>,
        instance: impl Into<String>,
        timestamp: DateTime<Utc>,
        assignment: Vec<Measurement>,
    ) -> Self {
        Self {
            symptom_type: symptom_type.into(),
            instance: instance.into(),
            timestamp,
            assignment,
        }
    }

    pub fn symptom_type(&self) -> &str {
        &self.symptom_type
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Checkpoint at which the symptom was raised
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Measurements that justified the finding, oldest first
    pub fn assignment(&self) -> &[Measurement] {
        &self.assignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_measurement_rejects_non_finite_values() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = Measurement::new("c1", "i1", "memory", ts(0), value);
            assert!(matches!(
                result,
                Err(DetectorError::InvalidMeasurement { .. })
            ));
        }
    }

    #[test]
    fn test_measurement_rejects_out_of_range_timestamp() {
        let result = Measurement::from_unix_millis("c1", "i1", "memory", i64::MAX, 1.0);
        assert!(matches!(
            result,
            Err(DetectorError::InvalidMeasurement { .. })
        ));
    }

    #[test]
    fn test_measurement_from_unix_millis() {
        let m = Measurement::from_unix_millis("c1", "i1", "memory", 60_000, 42.5).unwrap();
        assert_eq!(m.timestamp(), ts(60));
        assert_eq!(m.value(), 42.5);
        assert_eq!(m.identity(), ("i1", "memory", ts(60)));
    }

    #[test]
    fn test_symptom_serializes_assignment() {
        let m = Measurement::new("c7", "i7", "memory", ts(60), 9.0).unwrap();
        let symptom = Symptom::new("SYMPTOM_LOW:memory", "i7", ts(60), vec![m.clone()]);

        let json = serde_json::to_value(&symptom).unwrap();
        assert_eq!(json["symptom_type"], "SYMPTOM_LOW:memory");
        assert_eq!(json["assignment"][0]["instance"], "i7");

        let back: Symptom = serde_json::from_value(json).unwrap();
        assert_eq!(back.assignment(), &[m]);
    }

    #[test]
    fn test_equality_follows_identity_key() {
        let m = Measurement::new("c1", "i1", "memory", ts(60), 1.0).unwrap();
        let same_key = Measurement::new("c9", "i1", "memory", ts(60), 2.0).unwrap();
        let later = Measurement::new("c1", "i1", "memory", ts(120), 1.0).unwrap();

        assert_eq!(m, same_key);
        assert_ne!(m, later);

        let distinct: std::collections::HashSet<_> = [m, same_key, later].into_iter().collect();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn test_deserialize_rejects_non_finite_value() {
        let source = config::Config::builder()
            .set_override("component", "c1")
            .unwrap()
            .set_override("instance", "i1")
            .unwrap()
            .set_override("metric", "memory")
            .unwrap()
            .set_override("timestamp", "2023-11-14T22:13:20Z")
            .unwrap();

        let valid = source
            .clone()
            .set_override("value", 12.5)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<Measurement>()
            .unwrap();
        assert_eq!(valid.value(), 12.5);
        assert_eq!(valid.timestamp(), ts(1_700_000_000));

        for value in [f64::NAN, f64::INFINITY] {
            let result = source
                .clone()
                .set_override("value", value)
                .unwrap()
                .build()
                .unwrap()
                .try_deserialize::<Measurement>();
            assert!(result.is_err(), "value {value} should be rejected");
        }
    }
}
