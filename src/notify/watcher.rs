//! Periodic change detection for a single source.

use crate::error::{RefresherError, Result};
use crate::sources::{ChangeEvent, ContentFetcher, Fingerprint, MatchPolicy, Observation, Source};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::RefresherMetrics;

/// Timing and confirmation parameters shared by every watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Time between checks
    pub interval: Duration,
    /// Differing observations required before a change is confirmed
    pub threshold: u32,
    /// Effect of a baseline match while confirming
    pub policy: MatchPolicy,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(crate::core::DEFAULT_CHECK_INTERVAL_SECS),
            threshold: crate::core::DEFAULT_CONFIRMATION_THRESHOLD,
            policy: MatchPolicy::default(),
        }
    }
}

/// Drives one [`Source`] through the fetch, fingerprint, compare, confirm cycle.
///
/// The watcher owns its source exclusively. When a change is confirmed it
/// sends a [`ChangeEvent`] on the shared channel and moves on without
/// waiting for the reload.
///
/// # Examples
///
/// ```rust,no_run
/// use config_refresher::notify::{SourceWatcher, WatchOptions};
/// use config_refresher::sources::{HttpFetcher, Source};
/// use reqwest::Url;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
/// let source = Source::new("cfg", Url::parse("http://svc/cfg")?);
/// let fetcher = Arc::new(HttpFetcher::builder().build()?);
///
/// let watcher = SourceWatcher::new(source, fetcher, tx, WatchOptions::default());
/// tokio::spawn(watcher.run(CancellationToken::new()));
///
/// while let Some(event) = rx.recv().await {
///     println!("{} changed", event.source_id);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SourceWatcher {
    source: Source,
    fetcher: Arc<dyn ContentFetcher>,
    events: mpsc::UnboundedSender<ChangeEvent>,
    options: WatchOptions,
    #[cfg(feature = "metrics")]
    metrics: Option<RefresherMetrics>,
}

impl SourceWatcher {
    /// Create a watcher for `source` that reports confirmed changes on `events`.
    pub fn new(
        source: Source,
        fetcher: Arc<dyn ContentFetcher>,
        events: mpsc::UnboundedSender<ChangeEvent>,
        options: WatchOptions,
    ) -> Self {
        Self {
            source,
            fetcher,
            events,
            options,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Record check and change counters.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: RefresherMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The watched source and its current state.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Run a single check cycle.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when the check was skipped; the source state
    /// is left untouched in that case.
    pub async fn tick(&mut self) -> Result<Observation> {
        let content = self.fetch().await?;
        let fingerprint = Fingerprint::of(&content);
        let id = self.source.id().to_string();
        let previous = self.source.fingerprint().cloned();

        let outcome = self.source.observe(
            fingerprint.clone(),
            self.options.threshold,
            self.options.policy,
        );

        match &outcome {
            Observation::BaselineAdopted => {
                info!(id = %id, fingerprint = fingerprint.short(), "no fingerprint found, adopting baseline");
            }
            Observation::Unchanged => {
                debug!(id = %id, "matched fingerprint, skipping");
            }
            Observation::Suspected { confirmations } => {
                info!(
                    id = %id,
                    confirmations,
                    threshold = self.options.threshold,
                    old = previous.as_ref().map(Fingerprint::short).unwrap_or_default(),
                    new = fingerprint.short(),
                    "different fingerprint found, awaiting confirmation"
                );
            }
            Observation::Confirmed(event) => {
                info!(id = %id, new = fingerprint.short(), "change confirmed, commencing reload");

                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.record_change(&id);
                }

                if self.events.send(event.clone()).is_err() {
                    warn!(id = %id, "change dispatcher is gone, event dropped");
                }
            }
        }

        Ok(outcome)
    }

    /// Check the source on every interval until `cancel` fires.
    ///
    /// The first check happens one interval after start. Also stops once the
    /// dispatcher side of the channel has been dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        let period = self.options.interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(id = self.source.id(), interval = ?period, "watching source");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.tick() => {}
            }

            if self.events.is_closed() {
                break;
            }
        }

        debug!(id = self.source.id(), "watcher stopped");
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let id = self.source.id();

        #[cfg(feature = "metrics")]
        let timer = self.metrics.as_ref().map(|m| m.start_check(id));

        let result = self.fetcher.fetch(self.source.location()).await;

        #[cfg(feature = "metrics")]
        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            match &result {
                Ok(_) => metrics.record_fetch_success(id, timer),
                Err(_) => metrics.record_fetch_failure(id, timer),
            }
        }

        match &result {
            Err(RefresherError::FetchStatus { status }) => {
                warn!(id, status_code = status, "could not reach url");
            }
            Err(e) if e.is_soft() => {
                warn!(id, error = %e, "check skipped");
            }
            Err(e) => {
                error!(id, error = %e, "check failed");
            }
            Ok(_) => {}
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceState;
    use async_trait::async_trait;
    use reqwest::Url;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Fetcher returning a fixed script of results, then failing.
    struct ScriptedFetcher {
        script: Mutex<VecDeque<Result<Vec<u8>>>>,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<Result<Vec<u8>>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }

        fn contents(items: &[&str]) -> Arc<Self> {
            Self::new(items.iter().map(|c| Ok(c.as_bytes().to_vec())).collect())
        }
    }

    #[async_trait]
    impl ContentFetcher for ScriptedFetcher {
        async fn fetch(&self, _location: &Url) -> Result<Vec<u8>> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RefresherError::Fetch("script exhausted".into())))
        }
    }

    fn watcher(
        fetcher: Arc<ScriptedFetcher>,
        threshold: u32,
    ) -> (SourceWatcher, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Source::new("cfg", Url::parse("http://svc/cfg").unwrap());
        let options = WatchOptions {
            interval: Duration::from_secs(10),
            threshold,
            policy: MatchPolicy::KeepStreak,
        };
        (SourceWatcher::new(source, fetcher, tx, options), rx)
    }

    #[tokio::test]
    async fn test_tick_sequence_emits_once_confirmed() {
        let (mut watcher, mut rx) = watcher(ScriptedFetcher::contents(&["A", "A", "B", "B"]), 1);

        assert_eq!(watcher.tick().await.unwrap(), Observation::BaselineAdopted);
        assert!(rx.try_recv().is_err());

        assert_eq!(watcher.tick().await.unwrap(), Observation::Unchanged);
        assert!(rx.try_recv().is_err());

        assert_eq!(
            watcher.tick().await.unwrap(),
            Observation::Suspected { confirmations: 1 }
        );
        assert_eq!(watcher.source().confirmation_count(), 1);
        assert!(rx.try_recv().is_err());

        assert!(matches!(
            watcher.tick().await.unwrap(),
            Observation::Confirmed(_)
        ));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.source_id, "cfg");
        assert_eq!(event.fingerprint, Fingerprint::of(b"B"));
        assert_eq!(watcher.source().state(), SourceState::Stable);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_state_untouched() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(b"A".to_vec()),
            Ok(b"B".to_vec()),
            Err(RefresherError::FetchStatus { status: 503 }),
            Err(RefresherError::Fetch("connection refused".into())),
            Ok(b"B".to_vec()),
        ]);
        let (mut watcher, mut rx) = watcher(fetcher, 1);

        watcher.tick().await.unwrap();
        watcher.tick().await.unwrap();
        assert_eq!(watcher.source().confirmation_count(), 1);

        assert!(watcher.tick().await.is_err());
        assert!(watcher.tick().await.is_err());
        assert_eq!(watcher.source().confirmation_count(), 1);
        assert_eq!(watcher.source().fingerprint(), Some(&Fingerprint::of(b"A")));

        assert!(matches!(
            watcher.tick().await.unwrap(),
            Observation::Confirmed(_)
        ));
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_failure_before_baseline_stays_uninitialized() {
        let fetcher = ScriptedFetcher::new(vec![Err(RefresherError::Fetch("dns".into()))]);
        let (mut watcher, _rx) = watcher(fetcher, 3);

        assert!(watcher.tick().await.is_err());
        assert_eq!(watcher.source().state(), SourceState::Uninitialized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_checks_on_interval() {
        let (watcher, mut rx) = watcher(ScriptedFetcher::contents(&["A", "A", "B", "B"]), 1);
        let cancel = CancellationToken::new();
        let start = Instant::now();
        let handle = tokio::spawn(watcher.run(cancel.clone()));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.source_id, "cfg");

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(40), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(50), "elapsed {:?}", elapsed);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let (watcher, _rx) = watcher(ScriptedFetcher::contents(&["A"]), 1);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(watcher.run(cancel.clone()));

        time::sleep(Duration::from_secs(25)).await;
        cancel.cancel();

        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_dispatcher_dropped() {
        let (watcher, rx) = watcher(ScriptedFetcher::contents(&["A", "A"]), 1);
        drop(rx);

        let handle = tokio::spawn(watcher.run(CancellationToken::new()));
        time::timeout(Duration::from_secs(60), handle)
            .await
            .expect("watcher did not stop")
            .unwrap();
    }
}
