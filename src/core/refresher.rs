//! The running refresher: watchers fanned into one dispatcher.

use crate::core::RefresherBuilder;
use crate::error::Result;
use crate::notify::{DispatchStats, Dispatcher, SourceWatcher, WatchOptions};
use crate::reload::ReloadTrigger;
use crate::sources::{ContentFetcher, Source};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[cfg(feature = "metrics")]
use crate::metrics::RefresherMetrics;

/// Owns every watched source and the reload path.
///
/// [`Refresher::run`] spawns one task per source and dispatches confirmed
/// changes until the cancellation token fires.
pub struct Refresher {
    pub(crate) sources: Vec<Source>,
    pub(crate) fetcher: Arc<dyn ContentFetcher>,
    pub(crate) trigger: Arc<ReloadTrigger>,
    pub(crate) options: WatchOptions,
    pub(crate) cancel: CancellationToken,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: Option<RefresherMetrics>,
}

impl Refresher {
    /// Create a new builder for constructing a refresher.
    pub fn builder() -> RefresherBuilder {
        RefresherBuilder::new()
    }

    /// Token that stops every watcher and the dispatcher when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Ids of the watched sources, in source list order.
    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.iter().map(Source::id).collect()
    }

    /// Whether reloads are suppressed.
    pub fn is_dry_run(&self) -> bool {
        self.trigger.is_dry_run()
    }

    /// Watch every source until cancelled.
    ///
    /// State lives only in memory; a restarted refresher adopts each source's
    /// first observed content as its baseline without triggering a reload.
    ///
    /// # Errors
    ///
    /// Currently infallible once built; watcher panics are logged, not returned.
    pub async fn run(self) -> Result<DispatchStats> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watchers = JoinSet::new();

        info!(sources = self.sources.len(), "starting watchers");
        for source in self.sources {
            let watcher = SourceWatcher::new(source, Arc::clone(&self.fetcher), tx.clone(), self.options);
            #[cfg(feature = "metrics")]
            let watcher = match &self.metrics {
                Some(metrics) => watcher.with_metrics(metrics.clone()),
                None => watcher,
            };
            watchers.spawn(watcher.run(self.cancel.clone()));
        }
        drop(tx);

        let stats = Dispatcher::new(rx, self.trigger).run(self.cancel.clone()).await;

        self.cancel.cancel();
        while let Some(joined) = watchers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "watcher task failed");
            }
        }

        info!(
            events = stats.events,
            patched = stats.patched,
            patch_failures = stats.patch_failures,
            list_failures = stats.list_failures,
            "refresher stopped"
        );
        Ok(stats)
    }
}
