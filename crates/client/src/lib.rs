//! Client side of the daybook sync engine.
//!
//! This crate provides the remote object-store boundary, the offline-first
//! sync engine (conditional reads, queued writes, replay, conflict
//! resolution), and the typed diary facade built on top of it.

pub mod diary;
pub mod remote;
pub mod sync;

pub use remote::{DeleteOutcome, GetOutcome, HttpStore, ObjectStore, PutOutcome, ReplayOutcome};
pub use sync::{
    DeleteResult, ReadResult, ReplayReport, SyncClient, SyncDaemon, SyncEvent, SyncHandle, WriteResult,
};
pub use sync::conflict::{ResolveConflict, Resolution};

pub use daybook_core::{Error, KeySpace, SyncDb};
