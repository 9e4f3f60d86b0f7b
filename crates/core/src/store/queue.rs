//! Durable write queue.
//!
//! Mutating requests that failed with a transport error are captured here
//! verbatim (URL, method, headers, body) and replayed in insertion order
//! once connectivity returns. The queue is a single FIFO across all
//! resources: a later write never overtakes an earlier one.

use super::connection::SyncDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A pending mutating request, exactly as it would have gone on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedWrite {
    pub id: i64,
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub attempts: u32,
}

/// A request about to be enqueued (no id yet).
#[derive(Debug, Clone)]
pub struct NewQueuedWrite {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl SyncDb {
    /// Append a request to the write queue. Returns the assigned id.
    pub async fn enqueue(&self, write: NewQueuedWrite) -> Result<i64, Error> {
        let headers = serde_json::to_string(&write.headers)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO write_queue (url, method, headers, body, attempts, enqueued_at)
                     VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                    params![write.url, write.method, headers, write.body, now],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// All pending requests in FIFO (insertion) order.
    pub async fn pending(&self) -> Result<Vec<QueuedWrite>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<QueuedWrite>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, url, method, headers, body, attempts
                     FROM write_queue ORDER BY id",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Option<Vec<u8>>>(4)?,
                            row.get::<_, u32>(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut writes = Vec::with_capacity(rows.len());
                for (id, url, method, headers, body, attempts) in rows {
                    let headers: Vec<(String, String)> =
                        serde_json::from_str(&headers).map_err(Error::Serialize)?;
                    writes.push(QueuedWrite { id, url, method, headers, body, attempts });
                }
                Ok(writes)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a request after successful replay (or after dropping it).
    pub async fn remove_queued(&self, id: i64) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM write_queue WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Increment a request's attempt counter. Returns the new count.
    pub async fn bump_attempts(&self, id: i64) -> Result<u32, Error> {
        self.conn
            .call(move |conn| -> Result<u32, Error> {
                conn.execute("UPDATE write_queue SET attempts = attempts + 1 WHERE id = ?1", params![id])?;
                let attempts =
                    conn.query_row("SELECT attempts FROM write_queue WHERE id = ?1", params![id], |row| {
                        row.get(0)
                    });
                match attempts {
                    Ok(n) => Ok(n),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of requests still waiting for replay.
    pub async fn pending_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM write_queue", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(url: &str, body: &[u8]) -> NewQueuedWrite {
        NewQueuedWrite {
            url: url.to_string(),
            method: "PUT".to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body.to_vec()),
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_list_fifo() {
        let db = SyncDb::open_in_memory().await.unwrap();
        db.enqueue(put("http://s/k1", b"one")).await.unwrap();
        db.enqueue(put("http://s/k2", b"two")).await.unwrap();

        let pending = db.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].url, "http://s/k1");
        assert_eq!(pending[1].url, "http://s/k2");
        assert!(pending[0].id < pending[1].id);
    }

    #[tokio::test]
    async fn test_body_preserved_byte_for_byte() {
        let db = SyncDb::open_in_memory().await.unwrap();
        let body = vec![0u8, 159, 146, 150, 255];
        db.enqueue(NewQueuedWrite {
            url: "http://s/k".to_string(),
            method: "PUT".to_string(),
            headers: vec![],
            body: Some(body.clone()),
        })
        .await
        .unwrap();

        let pending = db.pending().await.unwrap();
        assert_eq!(pending[0].body.as_deref(), Some(body.as_slice()));
    }

    #[tokio::test]
    async fn test_headers_round_trip() {
        let db = SyncDb::open_in_memory().await.unwrap();
        db.enqueue(put("http://s/k", b"x")).await.unwrap();
        let pending = db.pending().await.unwrap();
        assert_eq!(pending[0].headers[0].0, "content-type");
    }

    #[tokio::test]
    async fn test_remove() {
        let db = SyncDb::open_in_memory().await.unwrap();
        let id = db.enqueue(put("http://s/k", b"x")).await.unwrap();
        db.remove_queued(id).await.unwrap();
        assert_eq!(db.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bump_attempts() {
        let db = SyncDb::open_in_memory().await.unwrap();
        let id = db.enqueue(put("http://s/k", b"x")).await.unwrap();
        assert_eq!(db.bump_attempts(id).await.unwrap(), 1);
        assert_eq!(db.bump_attempts(id).await.unwrap(), 2);

        let pending = db.pending().await.unwrap();
        assert_eq!(pending[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_delete_method_with_no_body() {
        let db = SyncDb::open_in_memory().await.unwrap();
        db.enqueue(NewQueuedWrite {
            url: "http://s/k".to_string(),
            method: "DELETE".to_string(),
            headers: vec![],
            body: None,
        })
        .await
        .unwrap();

        let pending = db.pending().await.unwrap();
        assert_eq!(pending[0].method, "DELETE");
        assert!(pending[0].body.is_none());
    }
}
