//! Metrics sinks.
//!
//! [`MetricsFacadeSink`] forwards to the `metrics` crate, so whichever
//! recorder the process installs (Prometheus in the CLI) receives the
//! engine's counters and histograms. [`RecordingMetrics`] keeps them in
//! memory for assertions.

use legalstat_core::MetricsSink;
use parking_lot::Mutex;

fn facade_labels(labels: &[(&'static str, String)]) -> Vec<metrics::Label> {
    labels
        .iter()
        .map(|(key, value)| metrics::Label::new(*key, value.clone()))
        .collect()
}

/// Forwards to the global `metrics` recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsFacadeSink;

impl MetricsSink for MetricsFacadeSink {
    fn inc_counter(&self, name: &str, labels: &[(&'static str, String)]) {
        metrics::counter!(name.to_string(), facade_labels(labels)).increment(1);
    }

    fn observe_histogram(&self, name: &str, value: f64, labels: &[(&'static str, String)]) {
        metrics::histogram!(name.to_string(), facade_labels(labels)).record(value);
    }
}

/// One captured metric call.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    /// `1.0` for counter increments.
    pub value: f64,
    pub histogram: bool,
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct RecordingMetrics {
    samples: Mutex<Vec<MetricSample>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<MetricSample> {
        self.samples.lock().clone()
    }

    /// Sum of increments of counter `name` whose labels include every pair
    /// in `labels`.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.samples
            .lock()
            .iter()
            .filter(|s| !s.histogram && s.name == name && has_labels(s, labels))
            .count() as u64
    }

    /// Observations recorded for histogram `name`.
    pub fn histogram_values(&self, name: &str) -> Vec<f64> {
        self.samples
            .lock()
            .iter()
            .filter(|s| s.histogram && s.name == name)
            .map(|s| s.value)
            .collect()
    }

    fn push(&self, name: &str, value: f64, labels: &[(&'static str, String)], histogram: bool) {
        self.samples.lock().push(MetricSample {
            name: name.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            value,
            histogram,
        });
    }
}

fn has_labels(sample: &MetricSample, wanted: &[(&str, &str)]) -> bool {
    wanted
        .iter()
        .all(|(k, v)| sample.labels.iter().any(|(sk, sv)| sk == k && sv == v))
}

impl MetricsSink for RecordingMetrics {
    fn inc_counter(&self, name: &str, labels: &[(&'static str, String)]) {
        self.push(name, 1.0, labels, false);
    }

    fn observe_histogram(&self, name: &str, value: f64, labels: &[(&'static str, String)]) {
        self.push(name, value, labels, true);
    }
}
