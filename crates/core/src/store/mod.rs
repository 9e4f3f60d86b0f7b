//! SQLite-backed durable sync state.
//!
//! This module provides the persistent local store the sync engine runs
//! on, with async access via tokio-rusqlite. Three logical tables:
//!
//! - `etags`: last-known entity tag per resource key
//! - `bodies`: last-known successful body per resource key
//! - `write_queue`: FIFO of mutating requests pending replay
//!
//! The ETag and body for a key are always written together (see
//! [`SyncDb::store_validated`]); everything else relies on SQLite's
//! per-statement atomicity.

pub mod bodies;
pub mod connection;
pub mod etags;
pub mod migrations;
pub mod queue;

pub use crate::Error;

pub use connection::SyncDb;
pub use queue::{NewQueuedWrite, QueuedWrite};
