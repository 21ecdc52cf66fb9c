//! Mirroring of local entities to a remote table-per-entity backend.
//!
//! Every local mutation is pushed once. A failed push never undoes the
//! local write; it is recorded as [`SyncStatus::Failed`] on the entity.

mod memory;
mod rest;
mod rows;

pub use memory::MemoryRemote;
pub use rest::RestRemote;
pub use rows::{DocumentRow, MilestoneRow, NoteRow, PhaseRow, PhotoRow, SyncEntity, TaskRow};

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::core::db::{EntityKind, SyncStatus};

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("remote rejected credentials")]
    Unauthorized,
    #[error("could not decode remote rows: {0}")]
    Decode(String),
    #[error("remote unavailable")]
    Unavailable,
    #[error("no remote row {id} in {table}")]
    Missing { table: String, id: i64 },
}

/// A remote backend with one table per entity kind, keyed by `id`.
pub trait RemoteStore {
    fn select(&self, table: &str) -> impl Future<Output = Result<Vec<Value>, RemoteError>>;
    fn insert(&self, table: &str, row: Value) -> impl Future<Output = Result<(), RemoteError>>;
    /// Insert, or replace the row with the same id.
    fn upsert(&self, table: &str, row: Value) -> impl Future<Output = Result<(), RemoteError>>;
    /// Fails with [`RemoteError::Missing`] when no row has `id`.
    fn update(&self, table: &str, id: i64, row: Value) -> impl Future<Output = Result<(), RemoteError>>;
    fn delete(&self, table: &str, id: i64) -> impl Future<Output = Result<(), RemoteError>>;
}

/// Optional remote plus the translation between entities and remote rows.
#[derive(Debug, Clone)]
pub struct RemoteSync<R> {
    remote: Option<R>,
}

impl<R: RemoteStore> RemoteSync<R> {
    pub fn new(remote: Option<R>) -> Self {
        Self { remote }
    }

    pub fn is_configured(&self) -> bool {
        self.remote.is_some()
    }

    pub fn remote(&self) -> Option<&R> {
        self.remote.as_ref()
    }

    pub async fn push_insert<E: SyncEntity>(&self, entity: &E) -> SyncStatus {
        let Some(remote) = &self.remote else {
            return SyncStatus::LocalOnly;
        };
        let result = match serde_json::to_value(entity.to_row()) {
            Ok(row) => remote.insert(E::KIND.remote_table(), row).await,
            Err(e) => Err(RemoteError::Decode(e.to_string())),
        };
        record("insert", E::KIND, entity.id(), result)
    }

    /// Patches the remote row when the entity was last pushed successfully.
    /// Otherwise the remote may lack the row, so the whole row is upserted.
    pub async fn push_update<E: SyncEntity>(&self, entity: &E) -> SyncStatus {
        let Some(remote) = &self.remote else {
            return SyncStatus::LocalOnly;
        };
        let table = E::KIND.remote_table();
        let row = match serde_json::to_value(entity.to_row()) {
            Ok(row) => row,
            Err(e) => return record("update", E::KIND, entity.id(), Err(RemoteError::Decode(e.to_string()))),
        };
        if entity.sync_status() == SyncStatus::Synced {
            record("update", E::KIND, entity.id(), remote.update(table, entity.id(), row).await)
        } else {
            record("upsert", E::KIND, entity.id(), remote.upsert(table, row).await)
        }
    }

    pub async fn push_delete(&self, kind: EntityKind, id: i64) -> SyncStatus {
        let Some(remote) = &self.remote else {
            return SyncStatus::LocalOnly;
        };
        let result = remote.delete(kind.remote_table(), id).await;
        record("delete", kind, id, result)
    }

    /// All remote rows of `kind`, or `None` without a remote.
    pub async fn load<T: DeserializeOwned>(&self, kind: EntityKind) -> Result<Option<Vec<T>>, RemoteError> {
        let Some(remote) = &self.remote else {
            return Ok(None);
        };
        let rows = remote.select(kind.remote_table()).await?;
        let mut parsed = Vec::with_capacity(rows.len());
        for row in rows {
            parsed.push(serde_json::from_value(row).map_err(|e| RemoteError::Decode(e.to_string()))?);
        }
        tracing::debug!(%kind, count = parsed.len(), "Loaded remote rows");
        Ok(Some(parsed))
    }
}

fn record(op: &'static str, kind: EntityKind, id: i64, result: Result<(), RemoteError>) -> SyncStatus {
    match result {
        Ok(()) => SyncStatus::Synced,
        Err(e) => {
            tracing::warn!(op, %kind, id, error = %e, "Remote write failed, keeping local change");
            SyncStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{Color, Phase};

    fn phase() -> Phase {
        Phase {
            id: 4,
            name: "Framing".to_string(),
            color: Color::GRAY,
            sync_status: SyncStatus::Synced,
        }
    }

    #[tokio::test]
    async fn test_push_without_remote_is_local_only() {
        let sync: RemoteSync<MemoryRemote> = RemoteSync::new(None);
        assert_eq!(sync.push_insert(&phase()).await, SyncStatus::LocalOnly);
        assert_eq!(sync.push_delete(EntityKind::Phase, 4).await, SyncStatus::LocalOnly);
        assert!(sync.load::<PhaseRow>(EntityKind::Phase).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_push_and_load() {
        let remote = MemoryRemote::new();
        let sync = RemoteSync::new(Some(remote.clone()));
        assert_eq!(sync.push_insert(&phase()).await, SyncStatus::Synced);

        let mut renamed = phase();
        renamed.name = "Framing & sheathing".to_string();
        assert_eq!(sync.push_update(&renamed).await, SyncStatus::Synced);

        let rows = sync.load::<PhaseRow>(EntityKind::Phase).await.unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Framing & sheathing");

        assert_eq!(sync.push_delete(EntityKind::Phase, 4).await, SyncStatus::Synced);
        assert!(remote.rows("phases").await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_push_is_recorded() {
        let remote = MemoryRemote::new();
        remote.set_offline(true);
        let sync = RemoteSync::new(Some(remote));
        assert_eq!(sync.push_insert(&phase()).await, SyncStatus::Failed);
        assert!(sync.load::<PhaseRow>(EntityKind::Phase).await.is_err());
    }

    #[tokio::test]
    async fn test_update_of_missing_row_fails() {
        let sync = RemoteSync::new(Some(MemoryRemote::new()));
        assert_eq!(sync.push_update(&phase()).await, SyncStatus::Failed);
    }

    #[tokio::test]
    async fn test_update_after_failed_insert_upserts() {
        let remote = MemoryRemote::new();
        let sync = RemoteSync::new(Some(remote.clone()));
        let mut failed = phase();
        failed.sync_status = SyncStatus::Failed;
        assert_eq!(sync.push_update(&failed).await, SyncStatus::Synced);
        assert_eq!(remote.rows("phases").await.len(), 1);

        // A second upsert replaces rather than conflicts.
        failed.name = "Framing & sheathing".to_string();
        assert_eq!(sync.push_update(&failed).await, SyncStatus::Synced);
        let rows = remote.rows("phases").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Framing & sheathing");
    }
}
