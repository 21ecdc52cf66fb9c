use std::{future::Future, path::PathBuf};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::core::db::model::SyncStatus;
use crate::core::db::phase::default_status;

/// A file (drawing, permit, contract...) stored inside the project archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub file_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
    #[serde(skip, default = "default_status")]
    pub sync_status: SyncStatus,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub category: String,
    pub source_path: PathBuf,
}

/// A site photo stored inside the project archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: i64,
    pub caption: String,
    pub taken_on: Option<String>,
    pub file_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
    #[serde(skip, default = "default_status")]
    pub sync_status: SyncStatus,
}

#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub caption: String,
    pub taken_on: Option<Date>,
    pub source_path: PathBuf,
}

pub trait AttachmentRepository {
    fn get_documents(&self) -> impl Future<Output = anyhow::Result<Vec<Document>>>;
    fn get_document_by_id(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<Document>>>;
    fn add_document(&self, document: &NewDocument) -> impl Future<Output = anyhow::Result<Document>>;
    fn delete_document(&self, document: Document) -> impl Future<Output = anyhow::Result<()>>;
    fn get_photos(&self) -> impl Future<Output = anyhow::Result<Vec<Photo>>>;
    fn get_photo_by_id(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<Photo>>>;
    fn add_photo(&self, photo: &NewPhoto) -> impl Future<Output = anyhow::Result<Photo>>;
    fn delete_photo(&self, photo: Photo) -> impl Future<Output = anyhow::Result<()>>;
    /// Absolute path of a stored attachment inside the unpacked project.
    fn attachment_path(&self, file_name: &str) -> PathBuf;
}
