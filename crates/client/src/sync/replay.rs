//! Write-queue replay.
//!
//! A replay pass walks the queue in insertion order and reissues each
//! captured request. Any HTTP response removes the item; only a transport
//! failure keeps it. The pass stops at the first still-failing item so a
//! later write can never land before an earlier pending one. An item that
//! has exhausted its attempts is dropped instead: accepted data loss,
//! logged and counted so operators can see it.

use daybook_core::{Error, SyncDb};

use crate::remote::{ObjectStore, ReplayOutcome};

/// What a single replay pass accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Requests delivered and removed from the queue.
    pub replayed: usize,
    /// Requests dropped after exhausting their attempts.
    pub dropped: usize,
    /// Requests still queued after the pass.
    pub remaining: u64,
}

/// Run one replay pass over the queue in FIFO order.
///
/// `max_attempts` is the number of failed replays an item survives;
/// reaching it drops the item.
pub async fn replay_pass(db: &SyncDb, remote: &dyn ObjectStore, max_attempts: u32) -> Result<ReplayReport, Error> {
    let mut report = ReplayReport::default();

    for write in db.pending().await? {
        match remote.replay(&write).await? {
            ReplayOutcome::Delivered => {
                db.remove_queued(write.id).await?;
                report.replayed += 1;
            }
            ReplayOutcome::Offline => {
                let attempts = db.bump_attempts(write.id).await?;
                if attempts >= max_attempts {
                    tracing::warn!(
                        url = %write.url,
                        method = %write.method,
                        attempts,
                        "dropping queued write after exhausting replay attempts"
                    );
                    db.remove_queued(write.id).await?;
                    report.dropped += 1;
                    // A dead item must not wedge the queue; keep going.
                } else {
                    // Still alive: later items wait behind it.
                    break;
                }
            }
        }
    }

    report.remaining = db.pending_count().await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use daybook_core::QueuedWrite;
    use daybook_core::store::NewQueuedWrite;
    use std::sync::Mutex;

    use crate::remote::{DeleteOutcome, GetOutcome, PutOutcome};

    /// Remote that records replayed URLs and fails any URL on a deny list.
    struct ScriptedRemote {
        delivered: Mutex<Vec<String>>,
        failing: Vec<String>,
    }

    impl ScriptedRemote {
        fn new(failing: &[&str]) -> Self {
            Self {
                delivered: Mutex::new(Vec::new()),
                failing: failing.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for ScriptedRemote {
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

        async fn replay(&self, write: &QueuedWrite) -> Result<ReplayOutcome, Error> {
            if self.failing.contains(&write.url) {
                return Ok(ReplayOutcome::Offline);
            }
            self.delivered.lock().unwrap().push(write.url.clone());
            Ok(ReplayOutcome::Delivered)
        }
    }

    async fn queue_put(db: &SyncDb, url: &str) -> i64 {
        db.enqueue(NewQueuedWrite {
            url: url.to_string(),
            method: "PUT".to_string(),
            headers: vec![],
            body: Some(b"{}".to_vec()),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_replays_in_fifo_order() {
        let db = SyncDb::open_in_memory().await.unwrap();
        queue_put(&db, "http://remote/k1").await;
        queue_put(&db, "http://remote/k2").await;

        let remote = ScriptedRemote::new(&[]);
        let report = replay_pass(&db, &remote, 3).await.unwrap();

        assert_eq!(report.replayed, 2);
        assert_eq!(report.remaining, 0);
        let delivered = remote.delivered.lock().unwrap();
        assert_eq!(*delivered, vec!["http://remote/k1", "http://remote/k2"]);
    }

    #[tokio::test]
    async fn test_stops_at_first_failing_item() {
        let db = SyncDb::open_in_memory().await.unwrap();
        queue_put(&db, "http://remote/k1").await;
        queue_put(&db, "http://remote/k2").await;

        let remote = ScriptedRemote::new(&["http://remote/k1"]);
        let report = replay_pass(&db, &remote, 3).await.unwrap();

        assert_eq!(report.replayed, 0);
        assert_eq!(report.remaining, 2);
        assert!(remote.delivered.lock().unwrap().is_empty());

        let pending = db.pending().await.unwrap();
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[1].attempts, 0);
    }

    #[tokio::test]
    async fn test_drops_after_max_attempts_and_continues() {
        let db = SyncDb::open_in_memory().await.unwrap();
        queue_put(&db, "http://remote/dead").await;
        queue_put(&db, "http://remote/live").await;

        let remote = ScriptedRemote::new(&["http://remote/dead"]);

        // Two passes bump the dead item to the cap, third pass drops it
        // and lets the item behind it through.
        let r1 = replay_pass(&db, &remote, 3).await.unwrap();
        assert_eq!((r1.replayed, r1.dropped, r1.remaining), (0, 0, 2));
        let r2 = replay_pass(&db, &remote, 3).await.unwrap();
        assert_eq!((r2.replayed, r2.dropped, r2.remaining), (0, 0, 2));
        let r3 = replay_pass(&db, &remote, 3).await.unwrap();
        assert_eq!((r3.replayed, r3.dropped, r3.remaining), (1, 1, 0));

        let delivered = remote.delivered.lock().unwrap();
        assert_eq!(*delivered, vec!["http://remote/live"]);
    }

    #[tokio::test]
    async fn test_dropped_item_never_retried_again() {
        let db = SyncDb::open_in_memory().await.unwrap();
        queue_put(&db, "http://remote/dead").await;

        let remote = ScriptedRemote::new(&["http://remote/dead"]);
        replay_pass(&db, &remote, 1).await.unwrap();
        assert_eq!(db.pending_count().await.unwrap(), 0);

        let report = replay_pass(&db, &remote, 1).await.unwrap();
        assert_eq!(report, ReplayReport::default());
    }

    #[tokio::test]
    async fn test_empty_queue_is_a_noop() {
        let db = SyncDb::open_in_memory().await.unwrap();
        let remote = ScriptedRemote::new(&[]);
        let report = replay_pass(&db, &remote, 3).await.unwrap();
        assert_eq!(report, ReplayReport::default());
    }
}
