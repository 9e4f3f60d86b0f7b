//! Typed diary documents over the sync engine.
//!
//! Entries and settings are JSON documents stored per resource key. This
//! module is the save/load path the UI talks to: it serializes the typed
//! structs, routes them through [`SyncClient`], and owns the
//! resolve-then-retry-once loop for write conflicts.

mod normalize;

use std::sync::Arc;

use chrono::NaiveDate;
use daybook_core::{Error, KeySpace};
use serde::{Deserialize, Serialize};

use crate::sync::conflict::{ResolveConflict, merge_documents};
use crate::sync::{ReadResult, SyncClient, WriteResult};

pub use normalize::normalize_entry;

/// One item of the daily routine checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineTick {
    pub text: String,
    pub done: bool,
}

/// An uploaded attachment reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub uuid: String,
    pub ext: String,
}

/// Where an entry was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// Weather snapshot for the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

/// One diary entry, keyed by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entry {
    pub text: String,
    pub routine_ticks: Vec<RoutineTick>,
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    pub ink_used: u64,
}

/// Per-user settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: String,
    pub routine_template: Vec<RoutineTick>,
    pub timezone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self { theme: "paper".to_string(), routine_template: Vec::new(), timezone: "UTC".to_string() }
    }
}

/// Lifecycle state of an external data connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorStatus {
    Added,
    Paused,
    Revoked,
}

/// Wire shape of a connector status document.
#[derive(Serialize, Deserialize)]
struct ConnectorDoc {
    status: ConnectorStatus,
}

/// How a save landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Stored remotely.
    Saved,
    /// Stored remotely after a conflict was resolved.
    SavedAfterConflict,
    /// Captured into the write queue; will sync when connectivity returns.
    Deferred,
}

/// Diary save/load paths over the sync engine.
pub struct DiaryClient {
    sync: SyncClient,
    keys: KeySpace,
    resolver: Arc<dyn ResolveConflict>,
}

impl DiaryClient {
    pub fn new(sync: SyncClient, keys: KeySpace, resolver: Arc<dyn ResolveConflict>) -> Self {
        Self { sync, keys, resolver }
    }

    /// Load the entry for a date. `None` means no entry exists yet.
    pub async fn load_entry(&self, date: NaiveDate) -> Result<Option<Entry>, Error> {
        let key = self.keys.entry(date);
        match self.sync.read(&key).await? {
            ReadResult::Fresh(body) | ReadResult::Cached(body) => {
                let entry = serde_json::from_str(&normalize_entry(&body))?;
                Ok(Some(entry))
            }
            ReadResult::Absent => Ok(None),
        }
    }

    /// Save the entry for a date, resolving a version conflict if one
    /// arises. The conflict retry happens exactly once; if it is rejected
    /// too, the save fails.
    pub async fn save_entry(&self, date: NaiveDate, entry: &Entry) -> Result<SaveStatus, Error> {
        let key = self.keys.entry(date);
        let body = normalize_entry(&serde_json::to_string(entry)?);
        self.save_document(&key, &body).await
    }

    /// Load the settings document.
    pub async fn load_settings(&self) -> Result<Option<Settings>, Error> {
        let key = self.keys.settings();
        match self.sync.read(&key).await? {
            ReadResult::Fresh(body) | ReadResult::Cached(body) => Ok(Some(serde_json::from_str(&body)?)),
            ReadResult::Absent => Ok(None),
        }
    }

    /// Save the settings document, resolving conflicts like entries do.
    /// Settings have no primary text, so resolution is always the silent
    /// shallow merge.
    pub async fn save_settings(&self, settings: &Settings) -> Result<SaveStatus, Error> {
        let key = self.keys.settings();
        let body = serde_json::to_string(settings)?;
        self.save_document(&key, &body).await
    }

    /// Delete the entry for a date. Local caches are purged immediately;
    /// the remote deletion may be deferred to the queue.
    pub async fn delete_entry(&self, date: NaiveDate) -> Result<crate::sync::DeleteResult, Error> {
        self.sync.delete(&self.keys.entry(date)).await
    }

    /// Load a weekly summary document. Weekly documents are produced
    /// server-side; through the engine they are plain read-only resources.
    pub async fn load_weekly(&self, year: i32, iso_week: u32) -> Result<Option<serde_json::Value>, Error> {
        let key = self.keys.weekly(year, iso_week);
        match self.sync.read(&key).await? {
            ReadResult::Fresh(body) | ReadResult::Cached(body) => Ok(Some(serde_json::from_str(&body)?)),
            ReadResult::Absent => Ok(None),
        }
    }

    /// Status of an external connector, if one was ever recorded.
    pub async fn load_connector_status(&self, provider: &str) -> Result<Option<ConnectorStatus>, Error> {
        let key = self.keys.connector(provider);
        match self.sync.read(&key).await? {
            ReadResult::Fresh(body) | ReadResult::Cached(body) => {
                let doc: ConnectorDoc = serde_json::from_str(&body)?;
                Ok(Some(doc.status))
            }
            ReadResult::Absent => Ok(None),
        }
    }

    /// Record a connector's status, resolving conflicts like settings do.
    pub async fn save_connector_status(&self, provider: &str, status: ConnectorStatus) -> Result<SaveStatus, Error> {
        let key = self.keys.connector(provider);
        let body = serde_json::to_string(&ConnectorDoc { status })?;
        self.save_document(&key, &body).await
    }

    /// Search recently cached entries for a substring, offline.
    pub async fn search_recent(&self, days: i64, needle: &str) -> Result<Vec<(NaiveDate, String)>, Error> {
        let since = chrono::Utc::now() - chrono::Duration::days(days);
        let hits = self.sync.offline_search(&self.keys.entry_prefix(), since, needle).await?;

        let mut results = Vec::with_capacity(hits.len());
        for (key, body) in hits {
            if let Ok(date) = daybook_core::key::entry_date(&key) {
                results.push((date, body));
            }
        }
        Ok(results)
    }

    async fn save_document(&self, key: &str, body: &str) -> Result<SaveStatus, Error> {
        match self.sync.write(key, body).await? {
            WriteResult::Stored { .. } => Ok(SaveStatus::Saved),
            WriteResult::Deferred => Ok(SaveStatus::Deferred),
            WriteResult::Conflict { remote } => {
                tracing::debug!("conflict on {}, resolving", key);
                let resolved = merge_documents(remote.as_deref(), body, self.resolver.as_ref())?;
                self.sync.write_unconditional(key, &resolved).await?;
                Ok(SaveStatus::SavedAfterConflict)
            }
        }
    }
}
