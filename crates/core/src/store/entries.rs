//! Store and entry operations.
//!
//! Provides the cache-store surface the gateway strategies are written
//! against: upsert into a named store, per-store lookup, cross-store match,
//! store enumeration, and wholesale store deletion.

use super::connection::StoreDb;
use super::key::RequestKey;
use crate::response::CapturedResponse;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

fn row_to_response(row: &rusqlite::Row<'_>) -> Result<CapturedResponse, rusqlite::Error> {
    let status: u16 = row.get(0)?;
    let headers_json: String = row.get(1)?;
    let body: Vec<u8> = row.get(2)?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json).unwrap_or_default();
    Ok(CapturedResponse { status, headers, body })
}

impl StoreDb {
    /// Insert or update an entry in a named store.
    ///
    /// Creates the store row on first use. Uses UPSERT semantics: a later
    /// successful fetch of the same identity overwrites the captured response.
    pub async fn put(&self, store: &str, key: &RequestKey, response: &CapturedResponse) -> Result<(), Error> {
        let store = store.to_string();
        let key = key.clone();
        let response = response.clone();
        // Serializing a Vec of string pairs cannot fail in practice.
        let headers_json = serde_json::to_string(&response.headers).unwrap_or_else(|_| "[]".to_string());
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                conn.execute(
                    "INSERT INTO entries (store, key, method, url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(store, key) DO UPDATE SET
                         method = excluded.method,
                         url = excluded.url,
                         status = excluded.status,
                         headers_json = excluded.headers_json,
                         body = excluded.body,
                         stored_at = excluded.stored_at",
                    params![
                        store,
                        key.digest(),
                        key.method,
                        key.url,
                        response.status,
                        headers_json,
                        response.body,
                        now,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or update a batch of entries in a named store, atomically.
    ///
    /// All rows land in one transaction: either every entry is committed or
    /// none are, so a storage failure cannot leave a half-seeded store.
    pub async fn put_many(&self, store: &str, entries: &[(RequestKey, CapturedResponse)]) -> Result<(), Error> {
        let store = store.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let rows: Vec<(String, String, String, u16, String, Vec<u8>)> = entries
            .iter()
            .map(|(key, response)| {
                // Serializing a Vec of string pairs cannot fail in practice.
                let headers_json =
                    serde_json::to_string(&response.headers).unwrap_or_else(|_| "[]".to_string());
                (key.digest(), key.method.clone(), key.url.clone(), response.status, headers_json, response.body.clone())
            })
            .collect();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                for (digest, method, url, status, headers_json, body) in &rows {
                    tx.execute(
                        "INSERT INTO entries (store, key, method, url, status, headers_json, body, stored_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                         ON CONFLICT(store, key) DO UPDATE SET
                             method = excluded.method,
                             url = excluded.url,
                             status = excluded.status,
                             headers_json = excluded.headers_json,
                             body = excluded.body,
                             stored_at = excluded.stored_at",
                        params![store, digest, method, url, status, headers_json, body, now],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry in one named store.
    ///
    /// Returns None when the store has no entry for this identity.
    pub async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<CapturedResponse>, Error> {
        let store = store.to_string();
        let digest = key.digest();
        self.conn
            .call(move |conn| -> Result<Option<CapturedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT status, headers_json, body FROM entries WHERE store = ?1 AND key = ?2",
                    params![store, digest],
                    row_to_response,
                );
                match result {
                    Ok(resp) => Ok(Some(resp)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry across every store.
    ///
    /// Stores are searched in creation order, mirroring how the browser cache
    /// API matches across caches; the static store is seeded at install and
    /// therefore wins over later dynamic copies of the same identity.
    pub async fn match_any(&self, key: &RequestKey) -> Result<Option<CapturedResponse>, Error> {
        let digest = key.digest();
        self.conn
            .call(move |conn| -> Result<Option<CapturedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT e.status, e.headers_json, e.body
                     FROM entries e JOIN stores s ON s.name = e.store
                     WHERE e.key = ?1
                     ORDER BY s.created_at ASC, s.name ASC
                     LIMIT 1",
                    params![digest],
                    row_to_response,
                );
                match result {
                    Ok(resp) => Ok(Some(resp)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all stores present, in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and every entry it contains.
    ///
    /// Returns true if the store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a named store.
    pub async fn entry_count(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE store = ?1",
                    params![store],
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

    fn ok_response(body: &str) -> CapturedResponse {
        CapturedResponse::new(200, "text/html", body)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://app.local/index.html");

        db.put("static-v1", &key, &ok_response("<html>")).await.unwrap();

        let found = db.get("static-v1", &key).await.unwrap().unwrap();
        assert_eq!(found.status, 200);
        assert_eq!(found.body, b"<html>");
    }

    #[tokio::test]
    async fn test_put_many_commits_all_entries() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let shell = RequestKey::get("http://app.local/index.html");
        let script = RequestKey::get("http://app.local/assets/index.js");

        let seeded = vec![
            (shell.clone(), ok_response("<html>")),
            (script.clone(), ok_response("export {}")),
        ];
        db.put_many("static-v1", &seeded).await.unwrap();

        assert_eq!(db.entry_count("static-v1").await.unwrap(), 2);
        let found = db.get("static-v1", &shell).await.unwrap().unwrap();
        assert_eq!(found.body, b"<html>");
        // Re-seeding the same identities overwrites in place.
        db.put_many("static-v1", &[(shell.clone(), ok_response("<html>v2"))]).await.unwrap();
        assert_eq!(db.entry_count("static-v1").await.unwrap(), 2);
        let found = db.get("static-v1", &shell).await.unwrap().unwrap();
        assert_eq!(found.body, b"<html>v2");
    }

    #[tokio::test]
    async fn test_put_many_empty_creates_store() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.put_many("static-v1", &[]).await.unwrap();
        assert!(db.store_names().await.unwrap().contains(&"static-v1".to_string()));
        assert_eq!(db.entry_count("static-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://app.local/missing");
        assert!(db.get("static-v1", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://app.local/app.js");

        db.put("static-v1", &key, &ok_response("v1")).await.unwrap();
        db.put("static-v1", &key, &ok_response("v2")).await.unwrap();

        let found = db.get("static-v1", &key).await.unwrap().unwrap();
        assert_eq!(found.body, b"v2");
        assert_eq!(db.entry_count("static-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_match_any_prefers_earliest_store() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://app.local/shared");

        db.put("a-first", &key, &ok_response("first")).await.unwrap();
        db.put("b-second", &key, &ok_response("second")).await.unwrap();

        let found = db.match_any(&key).await.unwrap().unwrap();
        assert_eq!(found.body, b"first");
    }

    #[tokio::test]
    async fn test_match_any_missing() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://app.local/none");
        assert!(db.match_any(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_names_and_delete() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://app.local/x");

        db.put("static-v1", &key, &ok_response("s")).await.unwrap();
        db.put("dynamic-v1", &key, &ok_response("d")).await.unwrap();

        let names = db.store_names().await.unwrap();
        assert!(names.contains(&"static-v1".to_string()));
        assert!(names.contains(&"dynamic-v1".to_string()));

        assert!(db.delete_store("static-v1").await.unwrap());
        assert!(!db.delete_store("static-v1").await.unwrap());

        // Cascade removes the entries with the store.
        assert!(db.get("static-v1", &key).await.unwrap().is_none());
        let found = db.match_any(&key).await.unwrap().unwrap();
        assert_eq!(found.body, b"d");
    }

    #[tokio::test]
    async fn test_headers_round_trip() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let key = RequestKey::get("http://app.local/styled.css");
        let mut resp = ok_response("body { }");
        resp.headers.push(("etag".to_string(), "\"abc\"".to_string()));

        db.put("static-v1", &key, &resp).await.unwrap();
        let found = db.get("static-v1", &key).await.unwrap().unwrap();
        assert_eq!(found, resp);
    }
}
