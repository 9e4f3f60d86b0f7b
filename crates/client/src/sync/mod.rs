//! The sync engine: conditional reads, queued writes, replay.
//!
//! [`SyncClient`] sits between callers and the remote object store. Reads
//! revalidate with `if-none-match` and fall back to the local body cache;
//! mutating requests that fail at the transport level are captured into
//! the durable write queue and replayed by the background daemon.
//!
//! Cache updates are confirmed-only: the local ETag/body pair changes only
//! after the remote store acknowledged the operation. A deferred write
//! leaves the previously cached body visible until replay succeeds.

pub mod conflict;
pub mod daemon;
pub mod replay;

use std::sync::Arc;

use daybook_core::store::NewQueuedWrite;
use daybook_core::{Error, SyncDb};

use crate::remote::{DeleteOutcome, GetOutcome, ObjectStore, PutOutcome};

pub use daemon::{SyncDaemon, SyncEvent, SyncHandle};
pub use replay::ReplayReport;

/// Result of reading a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    /// Fresh body straight from the remote store.
    Fresh(String),
    /// Body served from the local cache (not-modified or fallback).
    Cached(String),
    /// The resource does not exist. Not an error.
    Absent,
}

impl ReadResult {
    /// The body, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            ReadResult::Fresh(body) | ReadResult::Cached(body) => Some(body),
            ReadResult::Absent => None,
        }
    }
}

/// Result of writing a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// Stored remotely; caches updated with the new tag when the server
    /// returned one.
    Stored { tag: Option<String> },
    /// Captured into the write queue; will sync when connectivity returns.
    /// Callers must present this as success-pending, not failure.
    Deferred,
    /// The server holds a newer version. `remote` is its current body,
    /// fetched fresh after the rejection (absent if it was deleted). The
    /// stale cached tag has already been cleared; resolve and retry.
    Conflict { remote: Option<String> },
}

/// Result of deleting a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteResult {
    /// The remote store confirmed the deletion.
    Deleted,
    /// Deletion queued for replay. Local caches are already purged.
    Deferred,
}

/// Offline-first client for versioned remote resources.
#[derive(Clone)]
pub struct SyncClient {
    db: SyncDb,
    remote: Arc<dyn ObjectStore>,
    handle: SyncHandle,
}

impl SyncClient {
    /// Create a sync client over a durable store and a remote store.
    pub fn new(db: SyncDb, remote: Arc<dyn ObjectStore>, handle: SyncHandle) -> Self {
        Self { db, remote, handle }
    }

    /// The shared sync handle (connectivity signal + event channel).
    pub fn handle(&self) -> &SyncHandle {
        &self.handle
    }

    /// Cached tag lookup that degrades to a miss if the store fails;
    /// an unusable cache must cost a conditional header, not a read.
    async fn cached_tag(&self, key: &str) -> Option<String> {
        match self.db.etag(key).await {
            Ok(tag) => tag,
            Err(e) => {
                tracing::warn!("etag lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn remember(&self, key: &str, tag: Option<&str>, body: &str) {
        let stored = match tag {
            Some(tag) => self.db.store_validated(key, tag, body).await,
            // No validator to pair with; keep the body for offline fallback
            // and leave any previous tag cleared out of the picture.
            None => {
                if let Err(e) = self.db.clear_etag(key).await {
                    tracing::warn!("failed to clear stale tag for {}: {}", key, e);
                }
                self.db.cache_body(key, body).await
            }
        };
        if let Err(e) = stored {
            tracing::warn!("failed to cache {} locally: {}", key, e);
        }
    }

    /// Read a resource by key with conditional revalidation.
    ///
    /// - fresh response: caches tag and body, returns [`ReadResult::Fresh`]
    /// - not-modified: returns the cached body; a missing local copy
    ///   triggers one unconditional retry before reporting absent
    /// - not-found: [`ReadResult::Absent`]
    /// - transport or server failure: cached body if present, otherwise
    ///   the failure propagates
    pub async fn read(&self, key: &str) -> Result<ReadResult, Error> {
        let tag = self.cached_tag(key).await;

        match self.remote.get(key, tag.as_deref()).await? {
            GetOutcome::Fresh { body, tag } => {
                self.remember(key, tag.as_deref(), &body).await;
                Ok(ReadResult::Fresh(body))
            }
            GetOutcome::NotModified => match self.db.cached_body(key).await? {
                Some(body) => Ok(ReadResult::Cached(body)),
                // The server validated a tag we have no body for. The
                // cache pair is broken; refetch without the condition.
                None => {
                    tracing::warn!("not-modified for {} with no cached body, refetching", key);
                    match self.remote.get(key, None).await? {
                        GetOutcome::Fresh { body, tag } => {
                            self.remember(key, tag.as_deref(), &body).await;
                            Ok(ReadResult::Fresh(body))
                        }
                        _ => Ok(ReadResult::Absent),
                    }
                }
            },
            GetOutcome::NotFound => Ok(ReadResult::Absent),
            GetOutcome::Offline => match self.db.cached_body(key).await? {
                Some(body) => Ok(ReadResult::Cached(body)),
                None => Err(Error::Unreachable(format!("no cached copy of {}", key))),
            },
            GetOutcome::Rejected { status } => match self.db.cached_body(key).await? {
                Some(body) => {
                    tracing::warn!("GET {} rejected with status {}, serving cache", key, status);
                    Ok(ReadResult::Cached(body))
                }
                None => Err(Error::Rejected { status }),
            },
        }
    }

    /// Write a resource by key with an optimistic-concurrency precondition.
    ///
    /// The cached tag, if any, rides along as `if-match`. A transport
    /// failure captures the request verbatim into the write queue before
    /// returning; an explicit rejection propagates without queueing
    /// (replaying a malformed request forever would only waste the queue).
    pub async fn write(&self, key: &str, body: &str) -> Result<WriteResult, Error> {
        let tag = self.cached_tag(key).await;

        match self.remote.put(key, body, tag.as_deref()).await? {
            PutOutcome::Stored { tag } => {
                self.remember(key, tag.as_deref(), body).await;
                Ok(WriteResult::Stored { tag })
            }
            PutOutcome::PreconditionFailed => {
                self.db.clear_etag(key).await?;
                let remote = match self.remote.get(key, None).await? {
                    GetOutcome::Fresh { body, tag } => {
                        self.remember(key, tag.as_deref(), &body).await;
                        Some(body)
                    }
                    GetOutcome::NotFound => None,
                    // Resolution needs the server's current state; without
                    // a live round-trip the conflict cannot be resolved.
                    GetOutcome::Offline => {
                        return Err(Error::Unreachable(format!("conflict on {} but server unreachable", key)));
                    }
                    GetOutcome::NotModified => self.db.cached_body(key).await?,
                    GetOutcome::Rejected { status } => return Err(Error::Rejected { status }),
                };
                Ok(WriteResult::Conflict { remote })
            }
            PutOutcome::Offline => {
                let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
                if let Some(tag) = tag {
                    headers.push(("if-match".to_string(), tag));
                }
                self.db
                    .enqueue(NewQueuedWrite {
                        url: self.remote.url_for(key),
                        method: "PUT".to_string(),
                        headers,
                        body: Some(body.as_bytes().to_vec()),
                    })
                    .await?;
                tracing::debug!("write to {} deferred to queue", key);
                Ok(WriteResult::Deferred)
            }
            PutOutcome::Rejected { status } => Err(Error::Rejected { status }),
        }
    }

    /// Write without a precondition, for the post-conflict retry.
    ///
    /// This path never queues: a transport failure here is fatal, since
    /// queueing a resolved write would silently discard the user's
    /// resolution decision against whatever the server holds by then.
    pub async fn write_unconditional(&self, key: &str, body: &str) -> Result<Option<String>, Error> {
        match self.remote.put(key, body, None).await? {
            PutOutcome::Stored { tag } => {
                self.remember(key, tag.as_deref(), body).await;
                Ok(tag)
            }
            PutOutcome::PreconditionFailed => Err(Error::Rejected { status: 412 }),
            PutOutcome::Offline => Err(Error::Unreachable(format!("retry of {} failed", key))),
            PutOutcome::Rejected { status } => Err(Error::Rejected { status }),
        }
    }

    /// Delete a resource by key.
    ///
    /// Local caches are purged and the deletion broadcast before the
    /// remote round-trip, matching the read path's cache-first fallbacks:
    /// a deleted entry must stop being served locally immediately.
    pub async fn delete(&self, key: &str) -> Result<DeleteResult, Error> {
        self.db.purge_resource(key).await?;
        self.handle.broadcast(SyncEvent::ResourceDeleted { key: key.to_string() });

        match self.remote.delete(key).await? {
            DeleteOutcome::Deleted => Ok(DeleteResult::Deleted),
            DeleteOutcome::Offline => {
                self.db
                    .enqueue(NewQueuedWrite {
                        url: self.remote.url_for(key),
                        method: "DELETE".to_string(),
                        headers: Vec::new(),
                        body: None,
                    })
                    .await?;
                tracing::debug!("delete of {} deferred to queue", key);
                Ok(DeleteResult::Deferred)
            }
            DeleteOutcome::Rejected { status } => Err(Error::Rejected { status }),
        }
    }

    /// Search cached bodies under a key prefix, newest-cached first by
    /// key order, without touching the network.
    pub async fn offline_search(
        &self,
        prefix: &str,
        since: chrono::DateTime<chrono::Utc>,
        needle: &str,
    ) -> Result<Vec<(String, String)>, Error> {
        let needle = needle.to_lowercase();
        let mut hits = self.db.recent_bodies(prefix, since).await?;
        hits.retain(|(_, body)| body.to_lowercase().contains(&needle));
        Ok(hits)
    }
}
