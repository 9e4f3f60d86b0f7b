//! Cached-body operations.
//!
//! One body per resource key, the latest one a successful read or write
//! observed. The body cache is fallback-only: it is served when the remote
//! store says not-modified or cannot be reached, and a fresh response
//! always supersedes it.

use super::connection::SyncDb;
use crate::Error;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl SyncDb {
    /// Store the body for a resource key, replacing any previous one.
    pub async fn cache_body(&self, key: &str, body: &str) -> Result<(), Error> {
        let key = key.to_string();
        let body = body.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO bodies (key, body, cached_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET body = excluded.body, cached_at = excluded.cached_at",
                    params![key, body, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the cached body for a resource key.
    pub async fn cached_body(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result =
                    conn.query_row("SELECT body FROM bodies WHERE key = ?1", params![key], |row| row.get(0));

                match result {
                    Ok(body) => Ok(Some(body)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the cached body for a resource key.
    pub async fn remove_body(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM bodies WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List cached bodies under a key prefix cached at or after `since`.
    ///
    /// Returns (key, body) pairs in key order. Serves offline search over
    /// recently viewed entries without touching the network.
    pub async fn recent_bodies(&self, prefix: &str, since: DateTime<Utc>) -> Result<Vec<(String, String)>, Error> {
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let since = since.to_rfc3339();
        self.conn
            .call(move |conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, body FROM bodies
                     WHERE key LIKE ?1 ESCAPE '\\' AND cached_at >= ?2
                     ORDER BY key",
                )?;
                let rows = stmt
                    .query_map(params![pattern, since], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}
