//! Built-in metrics for change detection and reloads.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Checks performed and fetch failures per source
//! - Fetch duration
//! - Confirmed changes
//! - Workloads patched and patch failures
//!
//! # Examples
//!
//! ```rust,no_run
//! use config_refresher::metrics::RefresherMetrics;
//! use opentelemetry::global;
//!
//! let metrics = RefresherMetrics::new(global::meter("config-refresher"));
//! metrics.record_change("payments");
//! ```

mod refresher_metrics;

pub use refresher_metrics::RefresherMetrics;
