//! Durable, WAL-journaled [`StorageAdapter`] backed by embedded SQLite.

use async_trait::async_trait;
use serde_json::Value as Json;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteJournalMode};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::domain::repositories::StorageAdapter;
use crate::domain::value_objects::SpaceId;
use crate::error::{EventSpaceError, Result};

pub struct SqliteAdapter {
    pool: SqlitePool,
}

impl SqliteAdapter {
    /// Open (creating if absent) a WAL-journaled SQLite database at `path`
    /// and ensure the `kv_entries` table and its space index exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.as_ref().display()))
            .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                space_id INTEGER NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (space_id, key)
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_kv_entries_space ON kv_entries (space_id)")
            .execute(&pool)
            .await
            .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;

        Ok(Self { pool })
    }

    fn decode_row(value: String) -> Result<Json> {
        serde_json::from_str(&value).map_err(EventSpaceError::from)
    }
}

#[async_trait]
impl StorageAdapter for SqliteAdapter {
    async fn get(&self, space_id: SpaceId, key: &str) -> Result<Option<Json>> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE space_id = ? AND key = ?")
            .bind(space_id.value() as i64)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(Self::decode_row(row.get::<String, _>("value"))?)),
            None => Ok(None),
        }
    }

    async fn put(&self, space_id: SpaceId, key: &str, value: Json) -> Result<()> {
        let serialized = serde_json::to_string(&value)?;
        sqlx::query(
            "INSERT INTO kv_entries (space_id, key, value) VALUES (?, ?, ?)
             ON CONFLICT (space_id, key) DO UPDATE SET value = excluded.value",
        )
        .bind(space_id.value() as i64)
        .bind(key)
        .bind(serialized)
        .execute(&self.pool)
        .await
        .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, space_id: SpaceId, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE space_id = ? AND key = ?")
            .bind(space_id.value() as i64)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;
        Ok(())
    }

    async fn scan(&self, space_id: SpaceId, prefix: &str) -> Result<Vec<(String, Json)>> {
        let like_pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query(
            "SELECT key, value FROM kv_entries WHERE space_id = ? AND key LIKE ? ESCAPE '\\' ORDER BY key",
        )
        .bind(space_id.value() as i64)
        .bind(like_pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let key: String = row.get("key");
                let value = Self::decode_row(row.get::<String, _>("value"))?;
                Ok((key, value))
            })
            .collect()
    }

    async fn multi_get(&self, space_id: SpaceId, keys: &[String]) -> Result<HashMap<String, Json>> {
        let mut out = HashMap::new();
        for key in keys {
            if let Some(value) = self.get(space_id, key).await? {
                out.insert(key.clone(), value);
            }
        }
        Ok(out)
    }

    async fn multi_put(&self, space_id: SpaceId, entries: Vec<(String, Json)>) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;

        for (key, value) in entries {
            let serialized = serde_json::to_string(&value)?;
            sqlx::query(
                "INSERT INTO kv_entries (space_id, key, value) VALUES (?, ?, ?)
                 ON CONFLICT (space_id, key) DO UPDATE SET value = excluded.value",
            )
            .bind(space_id.value() as i64)
            .bind(key)
            .bind(serialized)
            .execute(&mut *tx)
            .await
            .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;
        Ok(())
    }

    async fn delete_space(&self, space_id: SpaceId) -> Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE space_id = ?")
            .bind(space_id.value() as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| EventSpaceError::AdapterFailure(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn temp_adapter() -> (SqliteAdapter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventspace.db");
        let adapter = SqliteAdapter::open(path).await.unwrap();
        (adapter, dir)
    }

    #[tokio::test]
    async fn put_then_get_round_trips_refs() {
        let (adapter, _dir) = temp_adapter().await;
        let space = SpaceId::new(1);
        let value = json!({"deck": {"$ref": "deck:d1"}});
        adapter.put(space, "card:c1", value.clone()).await.unwrap();
        assert_eq!(adapter.get(space, "card:c1").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn multi_put_is_transactional_within_one_call() {
        let (adapter, _dir) = temp_adapter().await;
        let space = SpaceId::new(1);
        adapter
            .multi_put(space, vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))])
            .await
            .unwrap();
        let fetched = adapter
            .multi_get(space, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(fetched.len(), 2);
    }

    #[tokio::test]
    async fn data_survives_reopening_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventspace.db");
        {
            let adapter = SqliteAdapter::open(&path).await.unwrap();
            adapter.put(SpaceId::new(1), "k", json!("v")).await.unwrap();
        }
        let adapter = SqliteAdapter::open(&path).await.unwrap();
        assert_eq!(adapter.get(SpaceId::new(1), "k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn delete_space_sweeps_only_that_space() {
        let (adapter, _dir) = temp_adapter().await;
        adapter.put(SpaceId::new(1), "k", json!(1)).await.unwrap();
        adapter.put(SpaceId::new(2), "k", json!(2)).await.unwrap();
        adapter.delete_space(SpaceId::new(1)).await.unwrap();
        assert_eq!(adapter.get(SpaceId::new(1), "k").await.unwrap(), None);
        assert_eq!(adapter.get(SpaceId::new(2), "k").await.unwrap(), Some(json!(2)));
    }
}
