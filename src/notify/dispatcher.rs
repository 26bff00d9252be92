//! Serial dispatch of confirmed changes to the reload trigger.

use crate::reload::ReloadTrigger;
use crate::sources::ChangeEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters describing what a dispatcher handled before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events received from watchers
    pub events: usize,
    /// Events whose reload could not list workloads
    pub list_failures: usize,
    /// Workloads patched across all events
    pub patched: usize,
    /// Workload patches that failed across all events
    pub patch_failures: usize,
}

/// Single consumer of the change channel.
///
/// Reads events in arrival order and awaits the trigger for each one before
/// reading the next. A failed reload is logged and never stops the loop.
/// Cancellation also interrupts a reload in progress; workloads not yet
/// patched stay as they are.
pub struct Dispatcher {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    trigger: Arc<ReloadTrigger>,
}

impl Dispatcher {
    /// Create a dispatcher reading from `events`.
    pub fn new(events: mpsc::UnboundedReceiver<ChangeEvent>, trigger: Arc<ReloadTrigger>) -> Self {
        Self { events, trigger }
    }

    /// Handle events until `cancel` fires or every watcher has dropped its sender.
    pub async fn run(mut self, cancel: CancellationToken) -> DispatchStats {
        let mut stats = DispatchStats::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => {
                        debug!("all watchers stopped, dispatcher exiting");
                        break;
                    }
                },
            };

            stats.events += 1;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(id = %event.source_id, "shutdown during reload, remaining workloads not patched");
                    break;
                }
                _ = self.dispatch(&event, &mut stats) => {}
            }
        }

        stats
    }

    async fn dispatch(&self, event: &ChangeEvent, stats: &mut DispatchStats) {
        if event.source_id.is_empty() {
            warn!("received empty id on change channel");
            return;
        }

        match self.trigger.trigger(&event.source_id).await {
            Ok(report) => {
                stats.patched += report.patched;
                stats.patch_failures += report.failed;
                if !report.dry_run {
                    info!(
                        id = %event.source_id,
                        matched = report.matched,
                        patched = report.patched,
                        failed = report.failed,
                        "reload complete"
                    );
                }
            }
            Err(e) => {
                stats.list_failures += 1;
                error!(id = %event.source_id, error = %e, "reload failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RefresherError, Result};
    use crate::reload::{Workload, WorkloadApi};
    use crate::sources::Fingerprint;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    const KEY: &str = "refresher.mrl/source";

    struct RecordingCluster {
        workloads: Vec<Workload>,
        list_fails_for_first: Mutex<bool>,
        patched: Mutex<Vec<String>>,
    }

    impl RecordingCluster {
        fn new(pairs: &[(&str, &str)]) -> Arc<Self> {
            let workloads = pairs
                .iter()
                .map(|(name, source)| Workload {
                    namespace: "apps".to_string(),
                    name: name.to_string(),
                    annotations: BTreeMap::from([(KEY.to_string(), source.to_string())]),
                })
                .collect();
            Arc::new(Self {
                workloads,
                list_fails_for_first: Mutex::new(false),
                patched: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl WorkloadApi for RecordingCluster {
        async fn list_workloads(&self) -> Result<Vec<Workload>> {
            let mut fail = self.list_fails_for_first.lock().unwrap();
            if *fail {
                *fail = false;
                return Err(RefresherError::Orchestration("apiserver unavailable".into()));
            }
            Ok(self.workloads.clone())
        }

        async fn patch_annotation(
            &self,
            _namespace: &str,
            name: &str,
            _key: &str,
            _value: &str,
        ) -> Result<()> {
            self.patched.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    fn event(id: &str) -> ChangeEvent {
        ChangeEvent {
            source_id: id.to_string(),
            fingerprint: Fingerprint::of(id.as_bytes()),
        }
    }

    fn trigger(cluster: Arc<RecordingCluster>, dry_run: bool) -> Arc<ReloadTrigger> {
        Arc::new(
            ReloadTrigger::builder()
                .with_backend(cluster)
                .with_annotation_key(KEY)
                .with_dry_run(dry_run)
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_dispatches_in_order_until_senders_drop() {
        let cluster = RecordingCluster::new(&[("api", "a"), ("web", "b")]);
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(rx, trigger(Arc::clone(&cluster), false));

        tx.send(event("b")).unwrap();
        tx.send(event("a")).unwrap();
        drop(tx);

        let stats = dispatcher.run(CancellationToken::new()).await;
        assert_eq!(stats.events, 2);
        assert_eq!(stats.patched, 2);
        assert_eq!(*cluster.patched.lock().unwrap(), vec!["web", "api"]);
    }

    #[tokio::test]
    async fn test_list_failure_does_not_stop_dispatcher() {
        let cluster = RecordingCluster::new(&[("api", "a")]);
        *cluster.list_fails_for_first.lock().unwrap() = true;
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(rx, trigger(Arc::clone(&cluster), false));

        tx.send(event("a")).unwrap();
        tx.send(event("a")).unwrap();
        drop(tx);

        let stats = dispatcher.run(CancellationToken::new()).await;
        assert_eq!(stats.list_failures, 1);
        assert_eq!(stats.patched, 1);
        assert_eq!(stats.patch_failures, 0);
    }

    #[tokio::test]
    async fn test_empty_id_is_skipped() {
        let cluster = RecordingCluster::new(&[("api", "")]);
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(rx, trigger(Arc::clone(&cluster), false));

        tx.send(event("")).unwrap();
        drop(tx);

        let stats = dispatcher.run(CancellationToken::new()).await;
        assert_eq!(stats.events, 1);
        assert!(cluster.patched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_patches_nothing() {
        let cluster = RecordingCluster::new(&[("api", "a")]);
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(rx, trigger(Arc::clone(&cluster), true));

        tx.send(event("a")).unwrap();
        drop(tx);

        let stats = dispatcher.run(CancellationToken::new()).await;
        assert_eq!(stats.events, 1);
        assert_eq!(stats.patched, 0);
        assert!(cluster.patched.lock().unwrap().is_empty());
    }

    /// Backend whose API calls never complete.
    struct HungCluster;

    #[async_trait]
    impl WorkloadApi for HungCluster {
        async fn list_workloads(&self) -> Result<Vec<Workload>> {
            std::future::pending().await
        }

        async fn patch_annotation(
            &self,
            _namespace: &str,
            _name: &str,
            _key: &str,
            _value: &str,
        ) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_hung_reload() {
        let trigger = ReloadTrigger::builder()
            .with_backend(Arc::new(HungCluster))
            .with_dry_run(false)
            .build()
            .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Dispatcher::new(rx, Arc::new(trigger)).run(cancel.clone()));

        tx.send(event("a")).unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        cancel.cancel();

        let stats = tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("dispatcher did not stop")
            .unwrap();
        assert_eq!(stats.events, 1);
        assert_eq!(stats.patched, 0);
        assert_eq!(stats.list_failures, 0);
    }

    #[tokio::test]
    async fn test_stops_on_cancel_with_open_channel() {
        let cluster = RecordingCluster::new(&[]);
        let (_tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(rx, trigger(cluster, false));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = dispatcher.run(cancel).await;
        assert_eq!(stats, DispatchStats::default());
    }
}
