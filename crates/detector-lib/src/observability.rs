//! Observability for the detection core
//!
//! Provides:
//! - Prometheus metrics (detection latency, instances evaluated, symptoms raised)
//! - Structured logging of detector events with tracing

use prometheus::{core::Collector, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, util::TryInitError, EnvFilter};

use crate::models::Symptom;

/// Histogram buckets for detection latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DetectorMetricsInner> = OnceLock::new();

struct DetectorMetricsInner {
    detection_latency_seconds: Histogram,
    instances_evaluated: IntCounter,
    insufficient_history: IntCounter,
    symptoms_raised: IntCounterVec,
}

impl DetectorMetricsInner {
    // Options are static and always valid; only registration can fail
    fn new() -> Self {
        Self {
            detection_latency_seconds: register(
                Histogram::with_opts(
                    HistogramOpts::new(
                        "symptom_detector_detection_latency_seconds",
                        "Time spent in a single detect call",
                    )
                    .buckets(LATENCY_BUCKETS.to_vec()),
                )
                .expect("valid detection_latency_seconds options"),
            ),

            instances_evaluated: register(
                IntCounter::new(
                    "symptom_detector_instances_evaluated_total",
                    "Number of instance evaluations performed by detectors",
                )
                .expect("valid instances_evaluated options"),
            ),

            insufficient_history: register(
                IntCounter::new(
                    "symptom_detector_insufficient_history_total",
                    "Instance evaluations skipped for lack of checkpoint history",
                )
                .expect("valid insufficient_history options"),
            ),

            symptoms_raised: register(
                IntCounterVec::new(
                    Opts::new(
                        "symptom_detector_symptoms_raised_total",
                        "Number of symptoms raised, by symptom type",
                    ),
                    &["symptom_type"],
                )
                .expect("valid symptoms_raised options"),
            ),
        }
    }
}

/// Register a collector with the default registry
///
/// A name collision with a collector the host process already registered
/// leaves ours unexported but still counting.
fn register<C>(collector: C) -> C
where
    C: Collector + Clone + 'static,
{
    if let Err(e) = prometheus::register(Box::new(collector.clone())) {
        warn!(error = %e, "Detector metric not registered");
    }
    collector
}

/// Detector metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct DetectorMetrics {
    _private: (),
}

impl Default for DetectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DetectorMetricsInner {
        GLOBAL_METRICS.get_or_init(DetectorMetricsInner::new)
    }

    pub fn observe_detection_latency(&self, duration_secs: f64) {
        self.inner().detection_latency_seconds.observe(duration_secs);
    }

    pub fn inc_instances_evaluated(&self) {
        self.inner().instances_evaluated.inc();
    }

    pub fn inc_insufficient_history(&self) {
        self.inner().insufficient_history.inc();
    }

    pub fn inc_symptoms_raised(&self, symptom_type: &str) {
        self.inner()
            .symptoms_raised
            .with_label_values(&[symptom_type])
            .inc();
    }

    /// Current symptom count for a type
    pub fn symptoms_raised(&self, symptom_type: &str) -> u64 {
        self.inner()
            .symptoms_raised
            .with_label_values(&[symptom_type])
            .get()
    }
}

/// Structured logger for detector events
#[derive(Clone)]
pub struct StructuredLogger {
    detector: String,
}

impl StructuredLogger {
    pub fn new(detector: impl Into<String>) -> Self {
        Self {
            detector: detector.into(),
        }
    }

    pub fn log_initialized(&self, metric: &str, threshold: f64, required_checkpoints: usize) {
        info!(
            event = "detector_initialized",
            detector = %self.detector,
            metric = %metric,
            threshold = threshold,
            required_checkpoints = required_checkpoints,
            "Detector initialized"
        );
    }

    pub fn log_symptom(&self, symptom: &Symptom) {
        let values: Vec<f64> = symptom.assignment().iter().map(|m| m.value()).collect();
        warn!(
            event = "symptom_raised",
            detector = %self.detector,
            symptom_type = %symptom.symptom_type(),
            instance = %symptom.instance(),
            checkpoint = %symptom.timestamp(),
            values = ?values,
            "Symptom raised"
        );
    }

    pub fn log_insufficient_history(&self, instance: &str, available: usize, required: usize) {
        debug!(
            event = "insufficient_history",
            detector = %self.detector,
            instance = %instance,
            available = available,
            required = required,
            "Not enough checkpoints to decide"
        );
    }
}

/// Install a tracing subscriber with an env filter (default `info`)
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(json: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Measurement;
    use chrono::Utc;

    #[test]
    fn test_detector_metrics_counts_symptoms() {
        let metrics = DetectorMetrics::new();
        let before = metrics.symptoms_raised("SYMPTOM_TEST:observability");

        metrics.observe_detection_latency(0.0001);
        metrics.inc_instances_evaluated();
        metrics.inc_insufficient_history();
        metrics.inc_symptoms_raised("SYMPTOM_TEST:observability");

        assert_eq!(
            metrics.symptoms_raised("SYMPTOM_TEST:observability"),
            before + 1
        );
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("below-threshold");
        assert_eq!(logger.detector, "below-threshold");

        let m = Measurement::new("c1", "i1", "memory", Utc::now(), 1.0).unwrap();
        let symptom = Symptom::new("SYMPTOM_LOW:memory", "i1", m.timestamp(), vec![m]);
        logger.log_symptom(&symptom);
        logger.log_insufficient_history("i1", 1, 2);
    }
}
