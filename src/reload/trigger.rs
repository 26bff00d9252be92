//! Reload trigger that touches dependent workloads.

use super::WorkloadApi;
use crate::error::{RefresherError, Result};
use std::sync::Arc;
use tracing::{error, info};

#[cfg(feature = "metrics")]
use crate::metrics::RefresherMetrics;

/// Outcome of one trigger invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    /// Workloads whose annotation matched the source id
    pub matched: usize,
    /// Workloads successfully patched
    pub patched: usize,
    /// Workloads whose patch failed
    pub failed: usize,
    /// Whether the patch calls were skipped
    pub dry_run: bool,
}

/// Locates workloads depending on a source and signals each one to redeploy.
///
/// Every invocation does a full scan: it lists all workloads, selects those
/// whose `annotation_key` equals the source id, and patches `reload_key` on
/// each with the current unix timestamp. Patches are independent; a failure
/// is logged and the remaining workloads are still patched. Nothing is
/// retried or rolled back.
///
/// # Examples
///
/// ```rust,no_run
/// use config_refresher::reload::{KubeDeployments, ReloadTrigger};
/// use std::sync::Arc;
///
/// # async fn example() -> config_refresher::error::Result<()> {
/// let backend = KubeDeployments::try_default().await?;
/// let trigger = ReloadTrigger::builder()
///     .with_backend(Arc::new(backend))
///     .with_annotation_key("refresher.mrl/source")
///     .with_reload_key("refresher.mrl/reloaded-at")
///     .build()?;
///
/// let report = trigger.trigger("payments").await?;
/// println!("patched {} workloads", report.patched);
/// # Ok(())
/// # }
/// ```
pub struct ReloadTrigger {
    backend: Option<Arc<dyn WorkloadApi>>,
    annotation_key: String,
    reload_key: String,
    dry_run: bool,
    #[cfg(feature = "metrics")]
    metrics: Option<RefresherMetrics>,
}

impl ReloadTrigger {
    /// Create a new builder for constructing a reload trigger.
    pub fn builder() -> ReloadTriggerBuilder {
        ReloadTriggerBuilder::new()
    }

    /// Whether patch calls are suppressed.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Annotation compared against the source id.
    pub fn annotation_key(&self) -> &str {
        &self.annotation_key
    }

    /// Annotation written to trigger a redeploy.
    pub fn reload_key(&self) -> &str {
        &self.reload_key
    }

    /// Signal every workload depending on `source_id`.
    ///
    /// # Errors
    ///
    /// Returns an error only if listing workloads fails. Individual patch
    /// failures are logged and counted in the report.
    pub async fn trigger(&self, source_id: &str) -> Result<ReloadReport> {
        let backend = match (&self.backend, self.dry_run) {
            (Some(backend), false) => backend,
            _ => {
                info!(id = source_id, "reloading skipped as dry run flag is set");
                return Ok(ReloadReport {
                    dry_run: true,
                    ..Default::default()
                });
            }
        };

        let workloads = backend.list_workloads().await?;
        let stamp = chrono::Utc::now().timestamp().to_string();
        let mut report = ReloadReport::default();

        for workload in &workloads {
            let Some(value) = workload.annotation(&self.annotation_key) else {
                continue;
            };

            if value != source_id {
                info!(
                    namespace = %workload.namespace,
                    deployment = %workload.name,
                    id = source_id,
                    "found annotation but did not match"
                );
                continue;
            }

            report.matched += 1;
            match backend
                .patch_annotation(&workload.namespace, &workload.name, &self.reload_key, &stamp)
                .await
            {
                Ok(()) => {
                    report.patched += 1;
                    info!(
                        namespace = %workload.namespace,
                        deployment = %workload.name,
                        id = source_id,
                        "reloaded"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!(
                        namespace = %workload.namespace,
                        deployment = %workload.name,
                        id = source_id,
                        error = %e,
                        "reload failed"
                    );
                }
            }
        }

        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.record_reload(source_id, report.patched as u64, report.failed as u64);
        }

        Ok(report)
    }
}

/// Builder for constructing a `ReloadTrigger`.
pub struct ReloadTriggerBuilder {
    backend: Option<Arc<dyn WorkloadApi>>,
    annotation_key: String,
    reload_key: String,
    dry_run: bool,
    #[cfg(feature = "metrics")]
    metrics: Option<RefresherMetrics>,
}

impl ReloadTriggerBuilder {
    /// Create a new builder with the default annotation keys.
    pub fn new() -> Self {
        Self {
            backend: None,
            annotation_key: crate::core::DEFAULT_ANNOTATION_KEY.to_string(),
            reload_key: crate::core::DEFAULT_RELOAD_KEY.to_string(),
            dry_run: false,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Set the orchestration backend.
    pub fn with_backend(mut self, backend: Arc<dyn WorkloadApi>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the annotation compared against the source id.
    pub fn with_annotation_key(mut self, key: impl Into<String>) -> Self {
        self.annotation_key = key.into();
        self
    }

    /// Set the annotation written to trigger a redeploy.
    pub fn with_reload_key(mut self, key: impl Into<String>) -> Self {
        self.reload_key = key.into();
        self
    }

    /// Suppress every backend call, logging the would-be reload instead.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Record reload counters.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: RefresherMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the reload trigger.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend is set outside dry-run mode.
    pub fn build(self) -> Result<ReloadTrigger> {
        if self.backend.is_none() && !self.dry_run {
            return Err(RefresherError::Other(
                "ReloadTrigger requires a backend unless dry run is enabled".to_string(),
            ));
        }

        Ok(ReloadTrigger {
            backend: self.backend,
            annotation_key: self.annotation_key,
            reload_key: self.reload_key,
            dry_run: self.dry_run,
            #[cfg(feature = "metrics")]
            metrics: self.metrics,
        })
    }
}

impl Default for ReloadTriggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
