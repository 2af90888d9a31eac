//! SQLite-backed entry store with on-disk blob spillover
//!
//! Feed pages are small and live inline in the `entries` table. Unwrapped
//! portal photos are usually tens to hundreds of KB, so anything above
//! [`INLINE_THRESHOLD`] is written to `blobs/<shard>/<key>.bin` and the row
//! keeps only the relative path. Expired rows (and their blob files) are
//! pruned every time the store is opened.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, ToSql, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CacheError;

/// Bump when the table layout changes; older files are discarded
const SCHEMA_VERSION: i32 = 2;

/// Bodies larger than this go to a blob file instead of the table
const INLINE_THRESHOLD: usize = 10 * 1024;

type Result<T> = std::result::Result<T, CacheError>;

/// Entry store for cached feed pages and portal resolutions
pub struct CacheStorage {
    conn: Connection,
    blobs_dir: PathBuf,
}

/// Where an entry's body lives
enum Body<'a> {
    Inline(&'a [u8]),
    Blob(String),
}

impl CacheStorage {
    /// Open the store under the platform cache directory
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::cache_dir()?)
    }

    /// `~/.cache/civicgrid` on Linux, `~/Library/Caches/civicgrid` on macOS
    pub fn cache_dir() -> Result<PathBuf> {
        dirs::cache_dir()
            .map(|base| base.join("civicgrid"))
            .ok_or(CacheError::NoHome)
    }

    /// Open (or create) the store rooted at `cache_dir`, then prune expired entries
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        let db_path = cache_dir.join("cache.db");
        let blobs_dir = cache_dir.join("blobs");
        create_dir(&blobs_dir)?;

        let conn = Connection::open(&db_path)?;
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Discarding cache with schema v{} (current v{})",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            discard(&db_path, &blobs_dir)?;
            return Self::open_at(cache_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY NOT NULL,
                kind TEXT NOT NULL,
                scope TEXT,
                body BLOB,
                blob_file TEXT,
                stored_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_entries_expires ON entries(expires_at);
            CREATE INDEX IF NOT EXISTS idx_entries_kind ON entries(kind);
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        let storage = Self { conn, blobs_dir };
        let pruned = storage.prune_expired()?;
        if pruned > 0 {
            log::debug!("Pruned {} expired cache entries", pruned);
        }
        Ok(storage)
    }

    /// Body of a live entry, or `None` when missing or expired
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT body, blob_file FROM entries WHERE key = ?1 AND expires_at > ?2",
                params![key, Utc::now().timestamp()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((Some(body), None)) => Ok(Some(body)),
            Some((None, Some(blob_file))) => match std::fs::read(self.blobs_dir.join(&blob_file)) {
                Ok(body) => Ok(Some(body)),
                Err(e) => {
                    log::warn!("Cache blob {} unreadable, dropping entry: {}", blob_file, e);
                    self.conn
                        .execute("DELETE FROM entries WHERE key = ?1", [key])?;
                    Ok(None)
                }
            },
            _ => Ok(None),
        }
    }

    /// Store `data` under `key` for `ttl`, replacing any previous entry
    pub fn put(
        &self,
        key: &str,
        data: &[u8],
        kind: &str,
        scope: Option<&str>,
        ttl: Duration,
    ) -> Result<()> {
        let stored_at = Utc::now().timestamp();
        let expires_at = stored_at + ttl.as_secs() as i64;

        let previous_blob: Option<String> = self
            .conn
            .query_row(
                "SELECT blob_file FROM entries WHERE key = ?1",
                [key],
                |r| r.get(0),
            )
            .optional()?
            .flatten();

        let body = if data.len() > INLINE_THRESHOLD {
            Body::Blob(self.write_blob(key, data)?)
        } else {
            Body::Inline(data)
        };
        let (inline, blob_file) = match &body {
            Body::Inline(bytes) => (Some(*bytes), None),
            Body::Blob(path) => (None, Some(path.as_str())),
        };

        self.conn.execute(
            "INSERT OR REPLACE INTO entries
             (key, kind, scope, body, blob_file, stored_at, expires_at, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![key, kind, scope, inline, blob_file, stored_at, expires_at, data.len()],
        )?;

        // An entry that shrank below the threshold leaves its old blob behind
        if let Some(old) = previous_blob
            && blob_file != Some(old.as_str())
        {
            self.remove_blob(&old);
        }
        Ok(())
    }

    /// Remove every entry whose TTL has run out, with its blob file
    pub fn prune_expired(&self) -> Result<usize> {
        self.evict("expires_at <= ?1", &Utc::now().timestamp())
    }

    /// Remove every entry of one kind (`feed`, `portal_image`)
    pub fn delete_by_endpoint(&self, kind: &str) -> Result<ClearStats> {
        let entries_removed = self.evict("kind = ?1", &kind)?;
        Ok(ClearStats { entries_removed })
    }

    /// Remove everything, including stray blob files
    pub fn clear_all(&self) -> Result<ClearStats> {
        let entries_removed = self.conn.execute("DELETE FROM entries", [])?;

        if let Err(e) = std::fs::remove_dir_all(&self.blobs_dir) {
            log::warn!("Failed to remove cache blobs: {}", e);
        }
        create_dir(&self.blobs_dir)?;

        Ok(ClearStats { entries_removed })
    }

    /// Entry counts, total size and the live entries' age range
    pub fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now().timestamp();

        let (total, size): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0) FROM entries",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        let (valid, oldest, newest): (i64, Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT COUNT(*), MIN(stored_at), MAX(stored_at) FROM entries WHERE expires_at > ?1",
            [now],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;

        Ok(CacheStats {
            total_entries: total as usize,
            valid_entries: valid as usize,
            expired_entries: (total - valid) as usize,
            total_size_bytes: size as usize,
            oldest_entry: oldest,
            newest_entry: newest,
        })
    }

    /// Delete rows matching `filter` and then the blob files they pointed at
    fn evict(&self, filter: &str, value: &dyn ToSql) -> Result<usize> {
        let blobs: Vec<String> = {
            let sql = format!(
                "SELECT blob_file FROM entries WHERE {} AND blob_file IS NOT NULL",
                filter
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params![value], |r| r.get::<_, String>(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };

        let removed = self
            .conn
            .execute(&format!("DELETE FROM entries WHERE {}", filter), params![value])?;

        for blob in &blobs {
            self.remove_blob(blob);
        }
        Ok(removed)
    }

    /// Write `data` to `blobs/<first two key chars>/<key>.bin`, returning the relative path
    fn write_blob(&self, key: &str, data: &[u8]) -> Result<String> {
        let shard = &key[..2.min(key.len())];
        create_dir(&self.blobs_dir.join(shard))?;

        let relative = format!("{}/{}.bin", shard, key);
        std::fs::write(self.blobs_dir.join(&relative), data)
            .map_err(|e| CacheError::Io(format!("Failed to write blob {}: {}", relative, e)))?;
        Ok(relative)
    }

    fn remove_blob(&self, relative: &str) {
        if let Err(e) = std::fs::remove_file(self.blobs_dir.join(relative))
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!("Failed to remove cache blob {}: {}", relative, e);
        }
    }
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .map_err(|e| CacheError::Io(format!("Failed to create {}: {}", path.display(), e)))
}

/// Delete the database file and every blob
fn discard(db_path: &Path, blobs_dir: &Path) -> Result<()> {
    if db_path.exists() {
        std::fs::remove_file(db_path)
            .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
    }
    if blobs_dir.exists() {
        std::fs::remove_dir_all(blobs_dir)
            .map_err(|e| CacheError::Io(format!("Failed to remove blobs dir: {}", e)))?;
    }
    Ok(())
}

/// Result of `cache clear`
#[derive(Debug)]
pub struct ClearStats {
    pub entries_removed: usize,
}

/// Snapshot for `cache status`
#[derive(Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_size_bytes: usize,
    pub oldest_entry: Option<i64>,
    pub newest_entry: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn test_storage() -> (CacheStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::open_at(dir.path()).unwrap();
        (storage, dir)
    }

    fn blob_files(dir: &Path) -> usize {
        std::fs::read_dir(dir.join("blobs"))
            .unwrap()
            .flat_map(|shard| std::fs::read_dir(shard.unwrap().path()).unwrap())
            .count()
    }

    #[test]
    fn test_small_feed_page_stays_inline() {
        let (storage, dir) = test_storage();
        let page = br#"[{"service_request_id":"1"}]"#;

        storage.put("aa01", page, "feed", None, HOUR).unwrap();

        assert_eq!(storage.get("aa01").unwrap(), Some(page.to_vec()));
        assert_eq!(blob_files(dir.path()), 0);
    }

    #[test]
    fn test_photo_spills_to_blob_file() {
        let (storage, dir) = test_storage();
        let photo = vec![0xFF; 20_000];

        storage.put("bb02", &photo, "portal_image", None, HOUR).unwrap();

        assert_eq!(storage.get("bb02").unwrap(), Some(photo));
        assert!(dir.path().join("blobs/bb/bb02.bin").exists());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let (storage, _dir) = test_storage();

        storage
            .put("cc03", b"data", "feed", None, Duration::from_secs(0))
            .unwrap();

        assert_eq!(storage.get("cc03").unwrap(), None);
    }

    #[test]
    fn test_reopen_prunes_expired_rows_and_blobs() {
        let dir = TempDir::new().unwrap();
        {
            let storage = CacheStorage::open_at(dir.path()).unwrap();
            for i in 0..5 {
                let key = format!("{:02}expired", i);
                storage
                    .put(&key, &vec![b'x'; 50_000], "portal_image", None, Duration::ZERO)
                    .unwrap();
            }
            std::thread::sleep(Duration::from_millis(1100));
            storage
                .put("ffkeep", &vec![b'y'; 50_000], "portal_image", None, HOUR)
                .unwrap();
            assert_eq!(storage.stats().unwrap().expired_entries, 5);
        }

        let storage = CacheStorage::open_at(dir.path()).unwrap();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 0);
        assert_eq!(stats.total_size_bytes, 50_000);
        assert_eq!(blob_files(dir.path()), 1);
        assert!(storage.get("ffkeep").unwrap().is_some());
    }

    #[test]
    fn test_shrunken_entry_drops_old_blob() {
        let (storage, dir) = test_storage();

        storage
            .put("dd04", &vec![b'z'; 20_000], "portal_image", None, HOUR)
            .unwrap();
        storage.put("dd04", b"small", "portal_image", None, HOUR).unwrap();

        assert_eq!(storage.get("dd04").unwrap(), Some(b"small".to_vec()));
        assert_eq!(blob_files(dir.path()), 0);
    }

    #[test]
    fn test_missing_blob_drops_entry() {
        let (storage, dir) = test_storage();

        storage
            .put("ee05", &vec![b'q'; 20_000], "portal_image", None, HOUR)
            .unwrap();
        std::fs::remove_file(dir.path().join("blobs/ee/ee05.bin")).unwrap();

        assert_eq!(storage.get("ee05").unwrap(), None);
        assert_eq!(storage.stats().unwrap().total_entries, 0);
    }

    #[test]
    fn test_clear_all() {
        let (storage, dir) = test_storage();

        storage.put("k1", b"d1", "feed", None, HOUR).unwrap();
        storage
            .put("k2", &vec![b'p'; 20_000], "portal_image", None, HOUR)
            .unwrap();

        let stats = storage.clear_all().unwrap();
        assert_eq!(stats.entries_removed, 2);

        assert!(storage.get("k1").unwrap().is_none());
        assert!(storage.get("k2").unwrap().is_none());
        assert_eq!(blob_files(dir.path()), 0);
    }

    #[test]
    fn test_delete_by_endpoint_keeps_others() {
        let (storage, dir) = test_storage();

        storage
            .put("f1", b"feed", "feed", Some("https://a"), HOUR)
            .unwrap();
        storage
            .put("p1", &vec![b'y'; 20_000], "portal_image", None, HOUR)
            .unwrap();

        let stats = storage.delete_by_endpoint("portal_image").unwrap();
        assert_eq!(stats.entries_removed, 1);
        assert!(storage.get("p1").unwrap().is_none());
        assert!(storage.get("f1").unwrap().is_some());
        assert_eq!(blob_files(dir.path()), 0);
    }

    #[test]
    fn test_stats() {
        let (storage, _dir) = test_storage();

        storage.put("k1", b"data1", "feed", None, HOUR).unwrap();
        storage
            .put("k2", b"data2", "feed", None, Duration::from_secs(0))
            .unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 1);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.total_size_bytes, 10);
        assert!(stats.oldest_entry.is_some());
    }
}
