//! Remote object-store boundary.
//!
//! The engine talks to the remote store through the [`ObjectStore`] trait
//! so tests can substitute an in-memory fake. Every operation returns a
//! discriminated outcome instead of signalling expected protocol results
//! (not-modified, not-found, precondition-failed, offline) through errors;
//! callers pattern-match.

pub mod http;

use async_trait::async_trait;
use daybook_core::{Error, QueuedWrite};

pub use http::HttpStore;

/// Outcome of a conditional GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    /// Fresh body returned. The tag is absent if the server sent no `ETag`
    /// header; such a response cannot be revalidated later.
    Fresh { body: String, tag: Option<String> },
    /// Server confirmed the conditional tag still matches; no body sent.
    NotModified,
    /// Resource has never existed (distinct from any failure).
    NotFound,
    /// No response at all: connectivity failure.
    Offline,
    /// Explicit non-2xx response other than the cases above.
    Rejected { status: u16 },
}

/// Outcome of a conditional PUT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// Stored; the new entity tag, when the server returned one.
    Stored { tag: Option<String> },
    /// The `if-match` precondition failed: someone else wrote first.
    PreconditionFailed,
    /// No response at all: connectivity failure.
    Offline,
    /// Explicit rejection (malformed request, permanent server error).
    Rejected { status: u16 },
}

/// Outcome of a DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Deleted (or already absent).
    Deleted,
    /// No response at all: connectivity failure.
    Offline,
    /// Explicit rejection.
    Rejected { status: u16 },
}

/// Outcome of replaying a captured request verbatim.
///
/// Any HTTP response at all counts as delivered: the request made it to
/// the server, and whatever the server decided is final. Only a transport
/// failure keeps the request queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    Delivered,
    Offline,
}

/// Remote key-value object store with conditional request support.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Absolute URL a resource key maps to (captured into queued writes).
    fn url_for(&self, key: &str) -> String;

    /// Conditional GET; `if_none_match` carries the cached entity tag.
    async fn get(&self, key: &str, if_none_match: Option<&str>) -> Result<GetOutcome, Error>;

    /// Conditional PUT; `if_match` carries the cached entity tag.
    async fn put(&self, key: &str, body: &str, if_match: Option<&str>) -> Result<PutOutcome, Error>;

    /// Unconditional DELETE.
    async fn delete(&self, key: &str) -> Result<DeleteOutcome, Error>;

    /// Reissue a captured request exactly as it was first built.
    async fn replay(&self, write: &QueuedWrite) -> Result<ReplayOutcome, Error>;
}
