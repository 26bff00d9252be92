//! Builder for constructing Refresher instances.

use crate::core::{Refresher, Settings, Validate};
use crate::error::{RefresherError, Result};
use crate::reload::{ReloadTrigger, WorkloadApi};
use crate::sources::{ContentFetcher, HttpFetcher, SourceList};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(feature = "metrics")]
use crate::metrics::RefresherMetrics;

/// Builder for constructing a `Refresher` instance.
///
/// Everything the daemon needs is assembled here once at startup and then
/// owned by the [`Refresher`]; nothing is kept in process-wide state.
///
/// # Examples
///
/// ```rust,no_run
/// use config_refresher::prelude::*;
/// use config_refresher::reload::KubeDeployments;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<()> {
/// let settings = Settings::loader().with_env_prefix("REFRESHER").load()?;
/// let backend = KubeDeployments::try_default().await?;
///
/// let refresher = Refresher::builder()
///     .with_settings(settings)
///     .with_backend(Arc::new(backend))
///     .build()?;
///
/// refresher.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct RefresherBuilder {
    settings: Settings,
    sources: Option<SourceList>,
    fetcher: Option<Arc<dyn ContentFetcher>>,
    backend: Option<Arc<dyn WorkloadApi>>,
    cancel: Option<CancellationToken>,
    #[cfg(feature = "metrics")]
    metrics: Option<RefresherMetrics>,
}

impl RefresherBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            sources: None,
            fetcher: None,
            backend: None,
            cancel: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Use these settings instead of the defaults.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Use an already parsed source list instead of reading `sources_file`.
    pub fn with_sources(mut self, sources: SourceList) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Use a custom fetcher instead of the default HTTP fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set the orchestration backend. Required unless dry run is enabled.
    pub fn with_backend(mut self, backend: Arc<dyn WorkloadApi>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Share an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Record watch and reload metrics.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: RefresherMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the refresher.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings validation fails
    /// - The source list cannot be read or parsed, or is empty
    /// - The HTTP client cannot be constructed
    /// - No backend is set and dry run is disabled
    pub fn build(self) -> Result<Refresher> {
        self.settings.validate()?;

        let sources = match self.sources {
            Some(sources) => sources,
            None => SourceList::load(&self.settings.sources_file)?,
        };

        let fetcher: Arc<dyn ContentFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let mut http = HttpFetcher::builder().with_timeout(self.settings.fetch_timeout());
                if let Some(token) = &self.settings.fetch_bearer_token {
                    http = http.with_auth_token(token);
                }
                Arc::new(http.build()?)
            }
        };

        if self.backend.is_none() && !self.settings.dry_run {
            return Err(RefresherError::Other(
                "an orchestration backend is required when dry run is disabled".to_string(),
            ));
        }

        let mut trigger = ReloadTrigger::builder()
            .with_annotation_key(&self.settings.annotation_key)
            .with_reload_key(&self.settings.reload_key)
            .with_dry_run(self.settings.dry_run);
        if let Some(backend) = self.backend {
            trigger = trigger.with_backend(backend);
        }
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            trigger = trigger.with_metrics(metrics.clone());
        }

        info!(
            sources = sources.len(),
            interval = ?self.settings.check_interval(),
            threshold = self.settings.confirmation_threshold,
            dry_run = self.settings.dry_run,
            "refresher configured"
        );

        Ok(Refresher {
            sources: sources.into_iter().collect(),
            fetcher,
            trigger: Arc::new(trigger.build()?),
            options: self.settings.watch_options(),
            cancel: self.cancel.unwrap_or_default(),
            #[cfg(feature = "metrics")]
            metrics: self.metrics,
        })
    }
}

impl Default for RefresherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
