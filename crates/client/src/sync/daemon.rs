//! Background sync daemon.
//!
//! The daemon is the long-lived task that drains the write queue. It
//! shares no in-memory state with foreground callers: everything flows
//! through the durable store and the [`SyncHandle`] channels. The host
//! signals connectivity restoration via [`SyncHandle::connectivity_restored`];
//! the daemon runs one replay pass per signal and broadcasts the result,
//! so UI layers can reload state that may have gone stale.

use std::sync::Arc;

use daybook_core::{Error, SyncDb};
use tokio::sync::{Notify, broadcast};

use super::replay::{ReplayReport, replay_pass};
use crate::remote::ObjectStore;

/// Broadcast notifications from the sync engine.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A replay pass finished.
    ReplayCompleted(ReplayReport),
    /// A resource's local caches were purged as part of a deletion.
    ResourceDeleted { key: String },
}

/// Shared signal and notification channels.
///
/// Clone freely; all clones address the same daemon.
#[derive(Clone)]
pub struct SyncHandle {
    trigger: Arc<Notify>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncHandle {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self { trigger: Arc::new(Notify::new()), events }
    }

    /// Signal that connectivity is back. The daemon will run one replay
    /// pass per signal; a signal with an empty queue is harmless.
    pub fn connectivity_restored(&self) {
        self.trigger.notify_one();
    }

    /// Subscribe to sync notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub(crate) fn broadcast(&self, event: SyncEvent) {
        // No subscribers is fine; notifications are best-effort.
        let _ = self.events.send(event);
    }

    async fn triggered(&self) {
        self.trigger.notified().await;
    }
}

impl Default for SyncHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Long-lived replay task.
pub struct SyncDaemon {
    db: SyncDb,
    remote: Arc<dyn ObjectStore>,
    handle: SyncHandle,
    max_attempts: u32,
}

impl SyncDaemon {
    pub fn new(db: SyncDb, remote: Arc<dyn ObjectStore>, handle: SyncHandle, max_attempts: u32) -> Self {
        Self { db, remote, handle, max_attempts }
    }

    /// Run one replay pass and broadcast its report.
    pub async fn run_once(&self) -> Result<ReplayReport, Error> {
        let report = replay_pass(&self.db, self.remote.as_ref(), self.max_attempts).await?;
        tracing::debug!(
            replayed = report.replayed,
            dropped = report.dropped,
            remaining = report.remaining,
            "replay pass complete"
        );
        self.handle.broadcast(SyncEvent::ReplayCompleted(report));
        Ok(report)
    }

    /// Run forever, draining the queue once per connectivity signal.
    ///
    /// The queue is never polled: if items remain after a pass (the head
    /// is still failing), they wait for the next signal. Intended to be
    /// spawned: `tokio::spawn(daemon.run())`.
    pub async fn run(self) {
        loop {
            self.handle.triggered().await;
            if let Err(e) = self.run_once().await {
                tracing::error!("replay pass failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use daybook_core::QueuedWrite;
    use daybook_core::store::NewQueuedWrite;

    use crate::remote::{DeleteOutcome, GetOutcome, PutOutcome, ReplayOutcome};

    struct AlwaysDelivered;

    #[async_trait]
    impl ObjectStore for AlwaysDelivered {
        fn url_for(&self, key: &str) -> String {
            format!("http://remote/{key}")
        }

        async fn get(&self, _key: &str, _if_none_match: Option<&str>) -> Result<GetOutcome, Error> {
            Ok(GetOutcome::NotFound)
        }

        async fn put(&self, _key: &str, _body: &str, _if_match: Option<&str>) -> Result<PutOutcome, Error> {
            Ok(PutOutcome::Offline)
        }

        async fn delete(&self, _key: &str) -> Result<DeleteOutcome, Error> {
            Ok(DeleteOutcome::Offline)
        }

        async fn replay(&self, _write: &QueuedWrite) -> Result<ReplayOutcome, Error> {
            Ok(ReplayOutcome::Delivered)
        }
    }

    #[tokio::test]
    async fn test_run_once_broadcasts_report() {
        let db = SyncDb::open_in_memory().await.unwrap();
        db.enqueue(NewQueuedWrite {
            url: "http://remote/k".to_string(),
            method: "PUT".to_string(),
            headers: vec![],
            body: Some(b"{}".to_vec()),
        })
        .await
        .unwrap();

        let handle = SyncHandle::new();
        let mut events = handle.subscribe();

        let daemon = SyncDaemon::new(db, Arc::new(AlwaysDelivered), handle, 3);
        let report = daemon.run_once().await.unwrap();
        assert_eq!(report.replayed, 1);

        match events.recv().await.unwrap() {
            SyncEvent::ReplayCompleted(r) => assert_eq!(r.replayed, 1),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_signal_drives_running_daemon() {
        let db = SyncDb::open_in_memory().await.unwrap();
        db.enqueue(NewQueuedWrite {
            url: "http://remote/k".to_string(),
            method: "PUT".to_string(),
            headers: vec![],
            body: Some(b"{}".to_vec()),
        })
        .await
        .unwrap();

        let handle = SyncHandle::new();
        let mut events = handle.subscribe();

        let daemon = SyncDaemon::new(db.clone(), Arc::new(AlwaysDelivered), handle.clone(), 3);
        let task = tokio::spawn(daemon.run());

        handle.connectivity_restored();
        match events.recv().await.unwrap() {
            SyncEvent::ReplayCompleted(r) => {
                assert_eq!(r.replayed, 1);
                assert_eq!(r.remaining, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(db.pending_count().await.unwrap(), 0);

        task.abort();
    }
}
