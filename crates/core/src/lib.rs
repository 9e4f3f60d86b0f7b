//! Core types and shared functionality for the daybook sync engine.
//!
//! This crate provides:
//! - Durable local store (ETags, cached bodies, write queue) on SQLite
//! - Resource key derivation for diary documents
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod key;
pub mod store;

pub use error::Error;
pub use key::KeySpace;
pub use store::{QueuedWrite, SyncDb};
