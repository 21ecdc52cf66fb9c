//! Remote row shapes: one struct per table, snake_case columns.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::db::{Color, Document, EntityKind, Milestone, Note, Phase, Photo, SyncStatus, Task};

/// An entity that is mirrored to a remote table.
pub trait SyncEntity {
    const KIND: EntityKind;
    type Row: Serialize;

    fn id(&self) -> i64;
    /// Status recorded by the last push, as stored locally.
    fn sync_status(&self) -> SyncStatus;
    fn to_row(&self) -> Self::Row;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRow {
    pub id: i64,
    pub name: String,
    pub color: Color,
}

impl SyncEntity for Phase {
    const KIND: EntityKind = EntityKind::Phase;
    type Row = PhaseRow;

    fn id(&self) -> i64 {
        self.id
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn to_row(&self) -> PhaseRow {
        PhaseRow {
            id: self.id,
            name: self.name.clone(),
            color: self.color,
        }
    }
}

impl From<PhaseRow> for Phase {
    fn from(row: PhaseRow) -> Self {
        Phase {
            id: row.id,
            name: row.name,
            color: row.color,
            sync_status: SyncStatus::Synced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneRow {
    pub id: i64,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub phase_id: Option<i64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
}

impl SyncEntity for Milestone {
    const KIND: EntityKind = EntityKind::Milestone;
    type Row = MilestoneRow;

    fn id(&self) -> i64 {
        self.id
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn to_row(&self) -> MilestoneRow {
        MilestoneRow {
            id: self.id,
            title: self.title.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            phase_id: self.phase_id,
            notes: self.notes.clone(),
            completed: self.completed,
        }
    }
}

impl From<MilestoneRow> for Milestone {
    fn from(row: MilestoneRow) -> Self {
        Milestone {
            id: row.id,
            title: row.title,
            start_date: row.start_date,
            end_date: row.end_date,
            phase_id: row.phase_id,
            notes: row.notes,
            completed: row.completed,
            sync_status: SyncStatus::Synced,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub due_date: Option<String>,
    pub milestone_id: Option<i64>,
    pub completed: bool,
}

impl SyncEntity for Task {
    const KIND: EntityKind = EntityKind::Task;
    type Row = TaskRow;

    fn id(&self) -> i64 {
        self.id
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn to_row(&self) -> TaskRow {
        TaskRow {
            id: self.id,
            title: self.title.clone(),
            due_date: self.due_date.clone(),
            milestone_id: self.milestone_id,
            completed: self.completed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteRow {
    pub id: i64,
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SyncEntity for Note {
    const KIND: EntityKind = EntityKind::Note;
    type Row = NoteRow;

    fn id(&self) -> i64 {
        self.id
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn to_row(&self) -> NoteRow {
        NoteRow {
            id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
            created_at: self.created_at,
        }
    }
}

/// Only metadata is mirrored; the file itself stays in the project archive.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRow {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub file_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

impl SyncEntity for Document {
    const KIND: EntityKind = EntityKind::Document;
    type Row = DocumentRow;

    fn id(&self) -> i64 {
        self.id
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn to_row(&self) -> DocumentRow {
        DocumentRow {
            id: self.id,
            name: self.name.clone(),
            category: self.category.clone(),
            file_name: self.file_name.clone(),
            added_at: self.added_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoRow {
    pub id: i64,
    pub caption: String,
    pub taken_on: Option<String>,
    pub file_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
}

impl SyncEntity for Photo {
    const KIND: EntityKind = EntityKind::Photo;
    type Row = PhotoRow;

    fn id(&self) -> i64 {
        self.id
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn to_row(&self) -> PhotoRow {
        PhotoRow {
            id: self.id,
            caption: self.caption.clone(),
            taken_on: self.taken_on.clone(),
            file_name: self.file_name.clone(),
            added_at: self.added_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestone_row_uses_snake_case_columns() {
        let milestone = Milestone {
            id: 7,
            title: "Pour slab".to_string(),
            start_date: "2024-03-01".to_string(),
            end_date: "2024-03-02".to_string(),
            phase_id: Some(1),
            notes: String::new(),
            completed: true,
            sync_status: SyncStatus::Pending,
        };
        let row = serde_json::to_value(milestone.to_row()).unwrap();
        assert_eq!(row["start_date"], "2024-03-01");
        assert_eq!(row["phase_id"], 1);
        assert!(row.get("startDate").is_none());
        assert!(row.get("sync_status").is_none());

        // The in-memory shape is camelCase.
        let local = serde_json::to_value(&milestone).unwrap();
        assert_eq!(local["startDate"], "2024-03-01");
    }

    #[test]
    fn test_phase_row_round_trip_marks_synced() {
        let row: PhaseRow = serde_json::from_str(r##"{"id": 3, "name": "Roofing", "color": "#aa0000"}"##).unwrap();
        let phase = Phase::from(row);
        assert_eq!(phase.color, Color { r: 0xaa, g: 0, b: 0 });
        assert_eq!(phase.sync_status, SyncStatus::Synced);
    }
}
