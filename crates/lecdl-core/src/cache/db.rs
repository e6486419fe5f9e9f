//! SQLite-backed cache store.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::bundle::{MetadataBundle, BUNDLE_SCHEMA_VERSION};

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Listing row for `lecdl cached`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub key: String,
    pub schema_version: u32,
    /// Unix seconds.
    pub completed_at: i64,
}

/// Handle to the metadata cache database.
#[derive(Clone)]
pub struct CacheStore {
    pub(crate) pool: Pool<Sqlite>,
}

impl CacheStore {
    /// Open (or create) the database at `path`. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await
            .with_context(|| format!("open cache {}", path.display()))?;
        let store = CacheStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        // `payload_json` is a serialized MetadataBundle; `schema_version`
        // duplicates its version so stale rows are skipped without parsing.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metadata_cache (
                key TEXT PRIMARY KEY,
                schema_version INTEGER NOT NULL,
                payload_json TEXT NOT NULL,
                completed_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The bundle stored under `key`, if present and of the current schema.
    ///
    /// Rows from another schema version or with an unreadable payload are
    /// reported as absent so the caller recomputes and overwrites them.
    pub async fn get(&self, key: &str) -> Result<Option<MetadataBundle>> {
        let row = sqlx::query(
            r#"SELECT schema_version, payload_json FROM metadata_cache WHERE key = ?"#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let version: i64 = row.get("schema_version");
        if version != i64::from(BUNDLE_SCHEMA_VERSION) {
            tracing::warn!(%key, version, expected = BUNDLE_SCHEMA_VERSION, "ignoring cached bundle from another schema version");
            return Ok(None);
        }
        let payload: String = row.get("payload_json");
        match serde_json::from_str::<MetadataBundle>(&payload) {
            Ok(bundle) if bundle.schema_version == BUNDLE_SCHEMA_VERSION => Ok(Some(bundle)),
            Ok(bundle) => {
                tracing::warn!(%key, version = bundle.schema_version, "cached bundle version mismatch");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "ignoring unreadable cached bundle");
                Ok(None)
            }
        }
    }

    /// Store `bundle` under `key`, replacing any previous entry.
    pub async fn put(&self, key: &str, bundle: &MetadataBundle) -> Result<()> {
        let payload = serde_json::to_string(bundle)?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO metadata_cache (key, schema_version, payload_json, completed_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(key)
        .bind(i64::from(bundle.schema_version))
        .bind(payload)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete the entry under `key`. Returns whether one existed.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let res = sqlx::query(r#"DELETE FROM metadata_cache WHERE key = ?"#)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// All entries, most recent first.
    pub async fn list(&self) -> Result<Vec<CachedEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT key, schema_version, completed_at
            FROM metadata_cache
            ORDER BY completed_at DESC, key ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let version: i64 = row.get("schema_version");
            out.push(CachedEntry {
                key: row.get("key"),
                schema_version: u32::try_from(version).unwrap_or_default(),
                completed_at: row.get("completed_at"),
            });
        }
        Ok(out)
    }
}

fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
/// Open an in-memory database for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<CacheStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = CacheStore { pool };
    store.migrate().await?;
    Ok(store)
}
