//! In-memory remote backend for tests and offline runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::RwLock;

use super::{RemoteError, RemoteStore};

type Tables = HashMap<String, BTreeMap<i64, Value>>;

/// Shares its tables between clones, so a test can keep a handle while a
/// workspace owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    tables: Arc<RwLock<Tables>>,
    offline: Arc<AtomicBool>,
    failing_ids: Arc<RwLock<HashSet<i64>>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with [`RemoteError::Unavailable`] while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Writes touching `id` fail, in any table.
    pub async fn fail_id(&self, id: i64) {
        self.failing_ids.write().await.insert(id);
    }

    /// Rows of `table`, ordered by id.
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Seed a row as if another client had written it.
    pub async fn put(&self, table: &str, id: i64, row: Value) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .insert(id, row);
    }

    async fn check(&self, id: Option<i64>) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable);
        }
        if let Some(id) = id
            && self.failing_ids.read().await.contains(&id)
        {
            return Err(RemoteError::Http {
                status: 500,
                body: format!("write to row {} refused", id),
            });
        }
        Ok(())
    }
}

fn row_id(row: &Value) -> Result<i64, RemoteError> {
    row.get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| RemoteError::Decode("row has no integer id".to_string()))
}

impl RemoteStore for MemoryRemote {
    async fn select(&self, table: &str) -> Result<Vec<Value>, RemoteError> {
        self.check(None).await?;
        Ok(self.rows(table).await)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<(), RemoteError> {
        let id = row_id(&row)?;
        self.check(Some(id)).await?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        if rows.contains_key(&id) {
            return Err(RemoteError::Http {
                status: 409,
                body: format!("duplicate key {}", id),
            });
        }
        rows.insert(id, row);
        Ok(())
    }

    async fn upsert(&self, table: &str, row: Value) -> Result<(), RemoteError> {
        let id = row_id(&row)?;
        self.check(Some(id)).await?;
        self.put(table, id, row).await;
        Ok(())
    }

    async fn update(&self, table: &str, id: i64, row: Value) -> Result<(), RemoteError> {
        self.check(Some(id)).await?;
        let mut tables = self.tables.write().await;
        let missing = || RemoteError::Missing {
            table: table.to_string(),
            id,
        };
        let existing = tables.get_mut(table).and_then(|rows| rows.get_mut(&id)).ok_or_else(missing)?;
        match (existing, row) {
            (Value::Object(existing), Value::Object(patch)) => existing.extend(patch),
            (existing, row) => *existing = row,
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: i64) -> Result<(), RemoteError> {
        self.check(Some(id)).await?;
        if let Some(rows) = self.tables.write().await.get_mut(table) {
            rows.remove(&id);
        }
        Ok(())
    }
}
