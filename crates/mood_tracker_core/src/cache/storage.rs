//! Named cache generations of stored responses.
//!
//! # Invariants
//! - Entries are keyed by `(generation, request cache key)`; a later put
//!   for the same key replaces the earlier one.
//! - Cross-generation lookups search generations in creation order.
//! - Only `GET` requests ever match.

use super::http::{Request, Response};
use crate::db::{open_db, open_db_in_memory, DbError};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    Encoding(serde_json::Error),
    LockPoisoned,
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encoding(err) => write!(f, "cached headers encoding error: {err}"),
            Self::LockPoisoned => write!(f, "cache storage lock poisoned"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encoding(err) => Some(err),
            Self::LockPoisoned => None,
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encoding(value)
    }
}

#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Creates the generation if it does not exist yet; returns whether it
    /// was created by this call.
    async fn open(&self, generation: &str) -> CacheResult<bool>;
    /// Generation labels in creation order.
    async fn keys(&self) -> CacheResult<Vec<String>>;
    /// Returns whether a generation was removed.
    async fn delete(&self, generation: &str) -> CacheResult<bool>;
    /// Stores `response` for `request`, opening the generation if needed.
    async fn put(&self, generation: &str, request: &Request, response: Response)
        -> CacheResult<()>;
    async fn match_in(&self, generation: &str, request: &Request)
        -> CacheResult<Option<Response>>;
    /// First match across all generations.
    async fn match_any(&self, request: &Request) -> CacheResult<Option<Response>>;
}

type Generation = (String, HashMap<String, Response>);

/// In-process cache storage.
#[derive(Default)]
pub struct MemoryCacheStorage {
    generations: Mutex<Vec<Generation>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Vec<Generation>>> {
        self.generations.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

fn ensure_generation<'a>(
    generations: &'a mut Vec<Generation>,
    label: &str,
) -> &'a mut HashMap<String, Response> {
    let index = match generations.iter().position(|(name, _)| name == label) {
        Some(index) => index,
        None => {
            generations.push((label.to_string(), HashMap::new()));
            generations.len() - 1
        }
    };
    &mut generations[index].1
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, generation: &str) -> CacheResult<bool> {
        let mut generations = self.lock()?;
        if generations.iter().any(|(name, _)| name == generation) {
            return Ok(false);
        }
        ensure_generation(&mut generations, generation);
        Ok(true)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.lock()?.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn delete(&self, generation: &str) -> CacheResult<bool> {
        let mut generations = self.lock()?;
        let before = generations.len();
        generations.retain(|(name, _)| name != generation);
        Ok(generations.len() != before)
    }

    async fn put(
        &self,
        generation: &str,
        request: &Request,
        response: Response,
    ) -> CacheResult<()> {
        let mut generations = self.lock()?;
        ensure_generation(&mut generations, generation)
            .insert(request.cache_key().to_string(), response);
        Ok(())
    }

    async fn match_in(
        &self,
        generation: &str,
        request: &Request,
    ) -> CacheResult<Option<Response>> {
        if !request.is_read_only() {
            return Ok(None);
        }
        Ok(self
            .lock()?
            .iter()
            .find(|(name, _)| name == generation)
            .and_then(|(_, entries)| entries.get(request.cache_key()).cloned()))
    }

    async fn match_any(&self, request: &Request) -> CacheResult<Option<Response>> {
        if !request.is_read_only() {
            return Ok(None);
        }
        Ok(self
            .lock()?
            .iter()
            .find_map(|(_, entries)| entries.get(request.cache_key()).cloned()))
    }
}

/// Cache storage over the migrated `cache_generations`/`cache_entries` tables.
///
/// Statements are short local writes and run inline on the calling task.
pub struct SqliteCacheStorage {
    conn: Mutex<Connection>,
}

impl SqliteCacheStorage {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open_path(path: impl AsRef<Path>) -> CacheResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> CacheResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }
}

const ENTRY_SELECT_SQL: &str = "SELECT e.status, e.headers, e.body
FROM cache_entries e
JOIN cache_generations g ON g.label = e.generation";

fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(u16, String, Vec<u8>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode_entry(entry: Option<(u16, String, Vec<u8>)>) -> CacheResult<Option<Response>> {
    let Some((status, headers, body)) = entry else {
        return Ok(None);
    };
    Ok(Some(Response {
        status,
        headers: serde_json::from_str(&headers)?,
        body,
    }))
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn open(&self, generation: &str) -> CacheResult<bool> {
        let inserted = self.lock()?.execute(
            "INSERT OR IGNORE INTO cache_generations (label) VALUES (?1);",
            [generation],
        )?;
        Ok(inserted > 0)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT label FROM cache_generations ORDER BY created_at, rowid;")?;
        let labels = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(labels)
    }

    async fn delete(&self, generation: &str) -> CacheResult<bool> {
        let changed = self.lock()?.execute(
            "DELETE FROM cache_generations WHERE label = ?1;",
            [generation],
        )?;
        Ok(changed > 0)
    }

    async fn put(
        &self,
        generation: &str,
        request: &Request,
        response: Response,
    ) -> CacheResult<()> {
        let headers = serde_json::to_string(&response.headers)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO cache_generations (label) VALUES (?1);",
            [generation],
        )?;
        tx.execute(
            "INSERT INTO cache_entries (generation, request_url, status, headers, body)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(generation, request_url) DO UPDATE SET
                status = excluded.status,
                headers = excluded.headers,
                body = excluded.body,
                stored_at = (strftime('%s', 'now') * 1000);",
            params![
                generation,
                request.cache_key(),
                response.status,
                headers,
                response.body
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn match_in(
        &self,
        generation: &str,
        request: &Request,
    ) -> CacheResult<Option<Response>> {
        if !request.is_read_only() {
            return Ok(None);
        }
        let entry = self
            .lock()?
            .query_row(
                &format!("{ENTRY_SELECT_SQL} WHERE e.generation = ?1 AND e.request_url = ?2;"),
                params![generation, request.cache_key()],
                parse_entry,
            )
            .optional()?;
        decode_entry(entry)
    }

    async fn match_any(&self, request: &Request) -> CacheResult<Option<Response>> {
        if !request.is_read_only() {
            return Ok(None);
        }
        let entry = self
            .lock()?
            .query_row(
                &format!(
                    "{ENTRY_SELECT_SQL} WHERE e.request_url = ?1
                     ORDER BY g.created_at, g.rowid LIMIT 1;"
                ),
                [request.cache_key()],
                parse_entry,
            )
            .optional()?;
        decode_entry(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheStorage, MemoryCacheStorage, SqliteCacheStorage};
    use crate::cache::http::{Method, Request, Response};

    async fn exercise(storage: &dyn CacheStorage) {
        let page = Request::get("http://localhost/app.css");
        assert!(storage.open("v1").await.unwrap());
        assert!(!storage.open("v1").await.unwrap());
        storage
            .put("v2", &page, Response::ok("body { }").with_header("content-type", "text/css"))
            .await
            .unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["v1", "v2"]);
        let hit = storage.match_any(&page).await.unwrap().unwrap();
        assert_eq!(hit.body, b"body { }");
        assert_eq!(hit.header("Content-Type"), Some("text/css"));
        assert!(storage.match_in("v1", &page).await.unwrap().is_none());

        let post = Request::new(Method::Post, "http://localhost/app.css");
        assert!(storage.match_any(&post).await.unwrap().is_none());

        assert!(storage.delete("v2").await.unwrap());
        assert!(!storage.delete("v2").await.unwrap());
        assert!(storage.match_any(&page).await.unwrap().is_none());
        assert_eq!(storage.keys().await.unwrap(), vec!["v1"]);
    }

    #[tokio::test]
    async fn memory_storage_contract() {
        exercise(&MemoryCacheStorage::new()).await;
    }

    #[tokio::test]
    async fn sqlite_storage_contract() {
        exercise(&SqliteCacheStorage::open_in_memory().unwrap()).await;
    }

    #[tokio::test]
    async fn put_replaces_existing_entry_and_ignores_fragment() {
        let storage = SqliteCacheStorage::open_in_memory().unwrap();
        storage
            .put("v1", &Request::get("http://localhost/"), Response::ok("old"))
            .await
            .unwrap();
        storage
            .put("v1", &Request::get("http://localhost/#top"), Response::ok("new"))
            .await
            .unwrap();

        let hit = storage
            .match_in("v1", &Request::get("http://localhost/"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.body, b"new");
    }
}
