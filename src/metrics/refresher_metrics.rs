//! Refresher metrics tracking using OpenTelemetry.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for watch and reload operations.
///
/// Every instrument is tagged with the `source` attribute so per-source
/// behavior can be told apart.
///
/// # Examples
///
/// ```rust,no_run
/// use config_refresher::metrics::RefresherMetrics;
/// use opentelemetry::global;
///
/// let metrics = RefresherMetrics::new(global::meter("config-refresher"));
///
/// let timer = metrics.start_check("payments");
/// // ... fetch ...
/// metrics.record_fetch_success("payments", timer);
/// ```
#[derive(Clone)]
pub struct RefresherMetrics {
    checks: Counter<u64>,
    fetch_failures: Counter<u64>,
    fetch_duration: Histogram<f64>,
    changes_confirmed: Counter<u64>,
    workloads_patched: Counter<u64>,
    patch_failures: Counter<u64>,
}

impl RefresherMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let checks = meter
            .u64_counter("config_refresher.checks")
            .with_description("Total number of source checks")
            .build();

        let fetch_failures = meter
            .u64_counter("config_refresher.fetch.failures")
            .with_description("Number of checks skipped because the fetch failed")
            .build();

        let fetch_duration = meter
            .f64_histogram("config_refresher.fetch.duration")
            .with_description("Duration of source fetches in seconds")
            .with_unit("s")
            .build();

        let changes_confirmed = meter
            .u64_counter("config_refresher.changes.confirmed")
            .with_description("Number of confirmed source changes")
            .build();

        let workloads_patched = meter
            .u64_counter("config_refresher.reload.patched")
            .with_description("Number of workloads patched for reload")
            .build();

        let patch_failures = meter
            .u64_counter("config_refresher.reload.failures")
            .with_description("Number of workload patches that failed")
            .build();

        Self {
            checks,
            fetch_failures,
            fetch_duration,
            changes_confirmed,
            workloads_patched,
            patch_failures,
        }
    }

    /// Start a check of `source`.
    ///
    /// Returns an `Instant` to pass to `record_fetch_success` or
    /// `record_fetch_failure` once the fetch completes.
    pub fn start_check(&self, source: &str) -> Instant {
        self.checks.add(1, &attributes(source));
        Instant::now()
    }

    /// Record a fetch that produced content.
    pub fn record_fetch_success(&self, source: &str, start: Instant) {
        self.fetch_duration
            .record(start.elapsed().as_secs_f64(), &attributes(source));
    }

    /// Record a fetch that failed and skipped the check.
    pub fn record_fetch_failure(&self, source: &str, start: Instant) {
        let attrs = attributes(source);
        self.fetch_failures.add(1, &attrs);
        self.fetch_duration.record(start.elapsed().as_secs_f64(), &attrs);
    }

    /// Record a confirmed change.
    pub fn record_change(&self, source: &str) {
        self.changes_confirmed.add(1, &attributes(source));
    }

    /// Record the outcome of one reload trigger invocation.
    pub fn record_reload(&self, source: &str, patched: u64, failed: u64) {
        let attrs = attributes(source);
        self.workloads_patched.add(patched, &attrs);
        self.patch_failures.add(failed, &attrs);
    }
}

fn attributes(source: &str) -> [KeyValue; 1] {
    [KeyValue::new("source", source.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::global;

    #[test]
    fn test_metrics_creation() {
        let metrics = RefresherMetrics::new(global::meter("test"));

        // Test basic operations don't panic
        let timer = metrics.start_check("cfg");
        metrics.record_fetch_success("cfg", timer);

        let timer = metrics.start_check("cfg");
        metrics.record_fetch_failure("cfg", timer);

        metrics.record_change("cfg");
        metrics.record_reload("cfg", 2, 1);
    }

    #[test]
    fn test_metrics_clone() {
        let metrics = RefresherMetrics::new(global::meter("test"));
        let metrics2 = metrics.clone();

        let timer1 = metrics.start_check("a");
        let timer2 = metrics2.start_check("b");

        metrics.record_fetch_success("a", timer1);
        metrics2.record_fetch_success("b", timer2);
    }
}
