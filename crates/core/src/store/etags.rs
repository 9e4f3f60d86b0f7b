//! Entity-tag cache operations.
//!
//! Maps a resource key to the last entity tag the remote store returned
//! for it. Tags are opaque; they are only ever echoed back in conditional
//! request headers. A missing row simply means the next request goes out
//! unconditional.

use super::connection::SyncDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl SyncDb {
    /// Get the cached entity tag for a resource key.
    pub async fn etag(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row("SELECT tag FROM etags WHERE key = ?1", params![key], |row| row.get(0));

                match result {
                    Ok(tag) => Ok(Some(tag)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Store the entity tag for a resource key, replacing any previous one.
    pub async fn set_etag(&self, key: &str, tag: &str) -> Result<(), Error> {
        let key = key.to_string();
        let tag = tag.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO etags (key, tag, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET tag = excluded.tag, updated_at = excluded.updated_at",
                    params![key, tag, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Forget the entity tag for a resource key.
    ///
    /// Called on precondition failure: the tag no longer matches what the
    /// server holds, so the next request must go out unconditional.
    pub async fn clear_etag(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM etags WHERE key = ?1", params![key])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store the entity tag and body for a key in one transaction.
    ///
    /// The pair must never diverge: a cached tag always corresponds to the
    /// last cached body for that key.
    pub async fn store_validated(&self, key: &str, tag: &str, body: &str) -> Result<(), Error> {
        let key = key.to_string();
        let tag = tag.to_string();
        let body = body.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO etags (key, tag, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET tag = excluded.tag, updated_at = excluded.updated_at",
                    params![key, tag, now],
                )?;
                tx.execute(
                    "INSERT INTO bodies (key, body, cached_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET body = excluded.body, cached_at = excluded.cached_at",
                    params![key, body, now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entity tag and body for a key in one transaction.
    ///
    /// Used by the delete path so a confirmed deletion leaves no stale
    /// cache behind.
    pub async fn purge_resource(&self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM etags WHERE key = ?1", params![key])?;
                tx.execute("DELETE FROM bodies WHERE key = ?1", params![key])?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
