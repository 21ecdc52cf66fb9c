use std::future::Future;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::db::model::SyncStatus;
use crate::core::db::phase::default_status;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip, default = "default_status")]
    pub sync_status: SyncStatus,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub body: String,
}

pub trait NoteRepository {
    fn get_notes(&self) -> impl Future<Output = anyhow::Result<Vec<Note>>>;
    fn get_note_by_id(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<Note>>>;
    fn add_note(&self, note: &NewNote) -> impl Future<Output = anyhow::Result<Note>>;
    fn delete_note(&self, note: Note) -> impl Future<Output = anyhow::Result<()>>;
}
