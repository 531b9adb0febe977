//! Generation and response rows, and the SQLite [`CacheStore`] implementation.

use super::connection::CacheDb;
use super::keys::compute_entry_key;
use super::store::{CacheStore, MatchScope};
use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response stored inside a generation, keyed by request identity.
///
/// Also the currency handed back to the host for intervened fetches: a live
/// network response is captured into this shape and returned verbatim, and
/// cached fallbacks come out of it byte-for-byte as they went in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Request identity key: SHA-256 of method + URL.
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Response headers as a JSON object, one value per name.
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub fetched_at: String,
}

impl CachedResponse {
    /// Whether the status is a success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn response_from_row(row: &rusqlite::Row<'_>) -> Result<CachedResponse, rusqlite::Error> {
    Ok(CachedResponse {
        key: row.get(0)?,
        method: row.get(1)?,
        url: row.get(2)?,
        status: row.get::<_, i64>(3)? as u16,
        content_type: row.get(4)?,
        headers_json: row.get(5)?,
        body: row.get(6)?,
        fetched_at: row.get(7)?,
    })
}

const RESPONSE_COLUMNS: &str = "key, method, url, status, content_type, headers_json, body, fetched_at";

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        let generation = generation.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO generations (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![generation, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![generation])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn put_responses(&self, generation: &str, responses: &[CachedResponse]) -> Result<(), Error> {
        let generation = generation.to_string();
        let responses = responses.to_vec();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for response in &responses {
                    tx.execute(
                        "INSERT OR REPLACE INTO responses (
                            generation, key, method, url, status, content_type,
                            headers_json, body, fetched_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            generation,
                            response.key,
                            response.method,
                            response.url,
                            response.status as i64,
                            response.content_type,
                            response.headers_json,
                            response.body,
                            response.fetched_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_response(
        &self, scope: MatchScope<'_>, method: &str, url: &str,
    ) -> Result<Option<CachedResponse>, Error> {
        let key = compute_entry_key(method, url);
        let generation = match scope {
            MatchScope::Generation(name) => Some(name.to_string()),
            MatchScope::Any => None,
        };
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let result = match generation {
                    Some(generation) => conn.query_row(
                        &format!(
                            "SELECT {RESPONSE_COLUMNS} FROM responses WHERE generation = ?1 AND key = ?2"
                        ),
                        params![generation, key],
                        response_from_row,
                    ),
                    None => conn.query_row(
                        &format!(
                            "SELECT {RESPONSE_COLUMNS} FROM responses WHERE key = ?1
                             ORDER BY fetched_at DESC LIMIT 1"
                        ),
                        params![key],
                        response_from_row,
                    ),
                };

                match result {
                    Ok(response) => Ok(Some(response)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn count_responses(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM responses WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response(method: &str, url: &str, body: &[u8]) -> CachedResponse {
        CachedResponse {
            key: compute_entry_key(method, url),
            method: method.to_string(),
            url: url.to_string(),
            status: 200,
            content_type: Some("text/html".to_string()),
            headers_json: None,
            body: body.to_vec(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("4:sw-cache-").await.unwrap();
        db.open("4:sw-cache-").await.unwrap();

        assert_eq!(db.list_generations().await.unwrap(), vec!["4:sw-cache-".to_string()]);
    }

    #[tokio::test]
    async fn test_put_and_match_scoped() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("4:sw-cache-").await.unwrap();
        db.put_responses("4:sw-cache-", &[make_response("GET", "https://example.com/app.js", b"alert(1)")])
            .await
            .unwrap();

        let hit = db
            .match_response(MatchScope::Generation("4:sw-cache-"), "GET", "https://example.com/app.js")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.body, b"alert(1)");

        let other_scope = db
            .match_response(MatchScope::Generation("3:sw-cache-"), "GET", "https://example.com/app.js")
            .await
            .unwrap();
        assert!(other_scope.is_none());
    }

    #[tokio::test]
    async fn test_match_ignores_method_mismatch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("4:sw-cache-").await.unwrap();
        db.put_responses("4:sw-cache-", &[make_response("GET", "https://example.com/", b"doc")])
            .await
            .unwrap();

        let head = db
            .match_response(MatchScope::Generation("4:sw-cache-"), "HEAD", "https://example.com/")
            .await
            .unwrap();
        assert!(head.is_none());
    }

    #[tokio::test]
    async fn test_match_any_searches_all_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("3:sw-cache-").await.unwrap();
        db.put_responses("3:sw-cache-", &[make_response("GET", "https://example.com/old.js", b"old")])
            .await
            .unwrap();

        let current = db
            .match_response(MatchScope::Generation("4:sw-cache-"), "GET", "https://example.com/old.js")
            .await
            .unwrap();
        assert!(current.is_none());

        let any = db
            .match_response(MatchScope::Any, "GET", "https://example.com/old.js")
            .await
            .unwrap();
        assert!(any.is_some());
    }

    #[tokio::test]
    async fn test_delete_generation_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("3:sw-cache-").await.unwrap();
        db.put_responses("3:sw-cache-", &[make_response("GET", "https://example.com/app.js", b"v3")])
            .await
            .unwrap();

        assert!(db.delete_generation("3:sw-cache-").await.unwrap());
        assert!(db.list_generations().await.unwrap().is_empty());
        assert!(
            db.match_response(MatchScope::Any, "GET", "https://example.com/app.js")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_absent_generation_is_noop() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(!db.delete_generation("9:sw-cache-").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_batch_is_all_or_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        // Generation never opened: the FK constraint rejects the batch.
        let result = db
            .put_responses("4:sw-cache-", &[make_response("GET", "https://example.com/app.js", b"x")])
            .await;
        assert!(result.is_err());
        assert_eq!(db.count_responses("4:sw-cache-").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_responses() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("4:sw-cache-").await.unwrap();
        db.put_responses(
            "4:sw-cache-",
            &[
                make_response("GET", "https://example.com/a.js", b"a"),
                make_response("GET", "https://example.com/b.js", b"b"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(db.count_responses("4:sw-cache-").await.unwrap(), 2);
        assert_eq!(db.count_responses("3:sw-cache-").await.unwrap(), 0);
    }
}
