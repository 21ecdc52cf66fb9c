mod attachment;
mod milestone;
mod model;
mod note;
mod phase;
mod project;
mod state;
mod task;

use std::{path::Path, path::PathBuf, sync::Arc};

use anyhow::Context;
use sqlx::FromRow;
use state::ProjectState;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339};

pub use attachment::{AttachmentRepository, Document, NewDocument, NewPhoto, Photo};
pub use milestone::{Milestone, MilestoneRepository, MilestoneUpdate, NewMilestone, Schedule};
pub use model::{Color, EntityKind, SyncStatus, UnsyncedEntity};
pub use note::{NewNote, Note, NoteRepository};
pub use phase::{NewPhase, Phase, PhaseRepository, PhaseUpdate};
pub use project::{ProjectRepository, UpdateProjectSettings};
pub use task::{NewTask, Task, TaskRepository, TaskUpdate};

use crate::core::date::format_iso_date;

#[derive(Debug, Clone)]
pub struct ProjectDb {
    state: Arc<ProjectState>,
}

impl ProjectDb {
    pub async fn new<P: AsRef<Path>>(project_file: P) -> anyhow::Result<Self> {
        let db = Self {
            state: Arc::new(ProjectState::new(project_file).await?),
        };
        let created_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let mut conn = db.state.conn().await?;
        sqlx::query(r#"INSERT OR IGNORE INTO project_metadata (key, value) VALUES ('created_at', $1)"#)
            .bind(created_at)
            .execute(&mut **conn)
            .await?;
        drop(conn);
        Ok(db)
    }

    /// Explicitly save the project to disk.
    /// This is required when dropping in an async context (e.g., tests with #[tokio::test]).
    pub async fn save_project(&self) -> anyhow::Result<()> {
        self.state.save_project().await
    }

    pub async fn set_sync_status(
        &self,
        kind: EntityKind,
        id: i64,
        status: SyncStatus,
    ) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        let sql = format!("UPDATE {} SET sync_status = $1 WHERE id = $2", kind.table());
        sqlx::query(&sql)
            .bind(i64::from(status))
            .bind(id)
            .execute(&mut **conn)
            .await?;
        Ok(())
    }

    /// Every entity whose status is anything but `Synced`.
    pub async fn get_unsynced(&self) -> anyhow::Result<Vec<UnsyncedEntity>> {
        let mut conn = self.state.conn().await?;
        let mut unsynced = Vec::new();
        for kind in EntityKind::ALL {
            let sql = format!(
                "SELECT id, sync_status FROM {} WHERE sync_status != $1 ORDER BY id ASC",
                kind.table()
            );
            let rows: Vec<(i64, i64)> = sqlx::query_as(&sql)
                .bind(i64::from(SyncStatus::Synced))
                .fetch_all(&mut **conn)
                .await?;
            for (id, status) in rows {
                unsynced.push(UnsyncedEntity {
                    kind,
                    id,
                    status: SyncStatus::try_from(status)?,
                    deleted: false,
                });
            }
        }

        let deletes: Vec<(String, i64)> =
            sqlx::query_as("SELECT kind, entity_id FROM remote_delete ORDER BY kind ASC, entity_id ASC")
                .fetch_all(&mut **conn)
                .await?;
        for (table, id) in deletes {
            let kind = EntityKind::from_table(&table)
                .with_context(|| format!("Unknown entity kind {:?} in remote_delete", table))?;
            unsynced.push(UnsyncedEntity {
                kind,
                id,
                status: SyncStatus::Failed,
                deleted: true,
            });
        }
        Ok(unsynced)
    }

    /// Remember a deleted entity whose remote row could not be removed.
    pub async fn record_remote_delete(&self, kind: EntityKind, id: i64) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"INSERT OR IGNORE INTO remote_delete (kind, entity_id) VALUES ($1, $2)"#)
            .bind(kind.table())
            .bind(id)
            .execute(&mut **conn)
            .await?;
        Ok(())
    }

    /// Forget every pending remote delete of `kind`.
    pub async fn clear_remote_deletes(&self, kind: EntityKind) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"DELETE FROM remote_delete WHERE kind = $1"#)
            .bind(kind.table())
            .execute(&mut **conn)
            .await?;
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> anyhow::Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .with_context(|| format!("Invalid timestamp {:?} in project database", value))
}

impl ProjectRepository for ProjectDb {
    async fn get_project_name(&self) -> anyhow::Result<String> {
        let mut conn = self.state.conn().await?;
        let (name,): (String,) =
            sqlx::query_as(r#"SELECT value FROM project_metadata WHERE key = 'name'"#)
                .fetch_one(&mut **conn)
                .await?;
        Ok(name)
    }

    async fn get_project_created_at(&self) -> anyhow::Result<OffsetDateTime> {
        let mut conn = self.state.conn().await?;
        let (created_at,): (String,) =
            sqlx::query_as(r#"SELECT value FROM project_metadata WHERE key = 'created_at'"#)
                .fetch_one(&mut **conn)
                .await?;
        parse_timestamp(&created_at)
    }

    async fn set_project_settings(&self, settings: UpdateProjectSettings) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        let mut items = vec![];
        if let Some(name) = settings.name {
            items.push(("name", name));
        }
        if let Some(created_at) = settings.created_at {
            items.push(("created_at", created_at.format(&Rfc3339)?));
        }
        for (key, value) in items {
            sqlx::query(
                r#"INSERT INTO project_metadata (key, value) VALUES ($1, $2)
                ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value"#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut **conn)
            .await?;
        }
        Ok(())
    }
}

#[derive(FromRow)]
struct PhaseRecord {
    id: i64,
    name: String,
    color: i64,
    sync_status: i64,
}

impl TryFrom<PhaseRecord> for Phase {
    type Error = anyhow::Error;

    fn try_from(record: PhaseRecord) -> Result<Self, Self::Error> {
        Ok(Phase {
            id: record.id,
            name: record.name,
            color: Color::try_from(record.color)?,
            sync_status: SyncStatus::try_from(record.sync_status)?,
        })
    }
}

const PHASE_COLUMNS: &str = "id, name, color, sync_status";

impl PhaseRepository for ProjectDb {
    async fn get_phases(&self) -> anyhow::Result<Vec<Phase>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, PhaseRecord>(&format!(
            "SELECT {PHASE_COLUMNS} FROM phase ORDER BY position ASC, id ASC"
        ))
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(Phase::try_from)
        .collect()
    }

    async fn get_phase_by_id(&self, id: i64) -> anyhow::Result<Option<Phase>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, PhaseRecord>(&format!(
            "SELECT {PHASE_COLUMNS} FROM phase WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **conn)
        .await?
        .map(Phase::try_from)
        .transpose()
    }

    async fn add_phase(&self, phase: &NewPhase) -> anyhow::Result<Phase> {
        let mut conn = self.state.conn().await?;
        let record = sqlx::query_as::<_, PhaseRecord>(&format!(
            r#"INSERT INTO phase (name, color, position) VALUES ($1, $2, (
                SELECT COALESCE(MAX(position), -1) + 1 FROM phase
            )) RETURNING {PHASE_COLUMNS}"#
        ))
        .bind(&phase.name)
        .bind(i64::from(phase.color))
        .fetch_one(&mut **conn)
        .await?;
        Phase::try_from(record)
    }

    async fn update_phase(&self, phase: &Phase, update: &PhaseUpdate) -> anyhow::Result<Phase> {
        let mut conn = self.state.conn().await?;
        let record = sqlx::query_as::<_, PhaseRecord>(&format!(
            r#"UPDATE phase SET
                name = COALESCE($1, name),
                color = COALESCE($2, color)
            WHERE id = $3
            RETURNING {PHASE_COLUMNS}"#
        ))
        .bind(update.name.as_deref())
        .bind(update.color.map(i64::from))
        .bind(phase.id)
        .fetch_one(&mut **conn)
        .await?;
        Phase::try_from(record)
    }

    async fn upsert_phase(&self, phase: &Phase) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(
            r#"INSERT INTO phase (id, name, color, position, sync_status) VALUES ($1, $2, $3, (
                SELECT COALESCE(MAX(position), -1) + 1 FROM phase
            ), $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                color = EXCLUDED.color,
                sync_status = EXCLUDED.sync_status"#,
        )
        .bind(phase.id)
        .bind(&phase.name)
        .bind(i64::from(phase.color))
        .bind(i64::from(phase.sync_status))
        .execute(&mut **conn)
        .await?;
        Ok(())
    }

    async fn delete_phase(&self, phase: Phase) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"DELETE FROM phase WHERE id = $1"#)
            .bind(phase.id)
            .execute(&mut **conn)
            .await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct MilestoneRecord {
    id: i64,
    title: String,
    start_date: String,
    end_date: String,
    phase_id: Option<i64>,
    notes: String,
    completed: bool,
    sync_status: i64,
}

impl TryFrom<MilestoneRecord> for Milestone {
    type Error = anyhow::Error;

    fn try_from(record: MilestoneRecord) -> Result<Self, Self::Error> {
        Ok(Milestone {
            id: record.id,
            title: record.title,
            start_date: record.start_date,
            end_date: record.end_date,
            phase_id: record.phase_id,
            notes: record.notes,
            completed: record.completed,
            sync_status: SyncStatus::try_from(record.sync_status)?,
        })
    }
}

const MILESTONE_COLUMNS: &str =
    "id, title, start_date, end_date, phase_id, notes, completed, sync_status";

impl MilestoneRepository for ProjectDb {
    async fn get_milestones(&self) -> anyhow::Result<Vec<Milestone>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, MilestoneRecord>(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestone ORDER BY start_date ASC, id ASC"
        ))
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(Milestone::try_from)
        .collect()
    }

    async fn get_milestone_by_id(&self, id: i64) -> anyhow::Result<Option<Milestone>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, MilestoneRecord>(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestone WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **conn)
        .await?
        .map(Milestone::try_from)
        .transpose()
    }

    async fn add_milestone(&self, milestone: &NewMilestone) -> anyhow::Result<Milestone> {
        let mut conn = self.state.conn().await?;
        let record = sqlx::query_as::<_, MilestoneRecord>(&format!(
            r#"INSERT INTO milestone (title, start_date, end_date, phase_id, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MILESTONE_COLUMNS}"#
        ))
        .bind(&milestone.title)
        .bind(format_iso_date(milestone.schedule.start))
        .bind(format_iso_date(milestone.schedule.end))
        .bind(milestone.phase_id)
        .bind(&milestone.notes)
        .fetch_one(&mut **conn)
        .await?;
        Milestone::try_from(record)
    }

    async fn update_milestone(
        &self,
        milestone: &Milestone,
        update: &MilestoneUpdate,
    ) -> anyhow::Result<Milestone> {
        let mut conn = self.state.conn().await?;
        let phase_id = match update.phase_id {
            Some(phase_id) => phase_id,
            None => milestone.phase_id,
        };
        let start = update.schedule.map(|s| format_iso_date(s.start));
        let end = update.schedule.map(|s| format_iso_date(s.end));
        let record = sqlx::query_as::<_, MilestoneRecord>(&format!(
            r#"UPDATE milestone SET
                title = COALESCE($1, title),
                start_date = COALESCE($2, start_date),
                end_date = COALESCE($3, end_date),
                notes = COALESCE($4, notes),
                completed = COALESCE($5, completed),
                phase_id = $6
            WHERE id = $7
            RETURNING {MILESTONE_COLUMNS}"#
        ))
        .bind(update.title.as_deref())
        .bind(start)
        .bind(end)
        .bind(update.notes.as_deref())
        .bind(update.completed)
        .bind(phase_id)
        .bind(milestone.id)
        .fetch_one(&mut **conn)
        .await
        .with_context(|| format!("Failed to update milestone {}", milestone.id))?;
        Milestone::try_from(record)
    }

    async fn upsert_milestone(&self, milestone: &Milestone) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(
            r#"INSERT INTO milestone
            (id, title, start_date, end_date, phase_id, notes, completed, sync_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                phase_id = EXCLUDED.phase_id,
                notes = EXCLUDED.notes,
                completed = EXCLUDED.completed,
                sync_status = EXCLUDED.sync_status"#,
        )
        .bind(milestone.id)
        .bind(&milestone.title)
        .bind(&milestone.start_date)
        .bind(&milestone.end_date)
        .bind(milestone.phase_id)
        .bind(&milestone.notes)
        .bind(milestone.completed)
        .bind(i64::from(milestone.sync_status))
        .execute(&mut **conn)
        .await?;
        Ok(())
    }

    async fn delete_milestone(&self, milestone: Milestone) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"DELETE FROM milestone WHERE id = $1"#)
            .bind(milestone.id)
            .execute(&mut **conn)
            .await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct TaskRecord {
    id: i64,
    title: String,
    due_date: Option<String>,
    milestone_id: Option<i64>,
    completed: bool,
    sync_status: i64,
}

impl TryFrom<TaskRecord> for Task {
    type Error = anyhow::Error;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        Ok(Task {
            id: record.id,
            title: record.title,
            due_date: record.due_date,
            milestone_id: record.milestone_id,
            completed: record.completed,
            sync_status: SyncStatus::try_from(record.sync_status)?,
        })
    }
}

const TASK_COLUMNS: &str = "id, title, due_date, milestone_id, completed, sync_status";

impl TaskRepository for ProjectDb {
    async fn get_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM task ORDER BY completed ASC, due_date IS NULL, due_date ASC, id ASC"
        ))
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(Task::try_from)
        .collect()
    }

    async fn get_tasks_due(&self, day: Date) -> anyhow::Result<Vec<Task>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {TASK_COLUMNS} FROM task WHERE due_date = $1 ORDER BY id ASC"
        ))
        .bind(format_iso_date(day))
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(Task::try_from)
        .collect()
    }

    async fn get_task_by_id(&self, id: i64) -> anyhow::Result<Option<Task>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, TaskRecord>(&format!("SELECT {TASK_COLUMNS} FROM task WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut **conn)
            .await?
            .map(Task::try_from)
            .transpose()
    }

    async fn add_task(&self, task: &NewTask) -> anyhow::Result<Task> {
        let mut conn = self.state.conn().await?;
        let record = sqlx::query_as::<_, TaskRecord>(&format!(
            r#"INSERT INTO task (title, due_date, milestone_id) VALUES ($1, $2, $3)
            RETURNING {TASK_COLUMNS}"#
        ))
        .bind(&task.title)
        .bind(task.due_date.map(format_iso_date))
        .bind(task.milestone_id)
        .fetch_one(&mut **conn)
        .await?;
        Task::try_from(record)
    }

    async fn update_task(&self, task: &Task, update: &TaskUpdate) -> anyhow::Result<Task> {
        let mut conn = self.state.conn().await?;
        let due_date = match update.due_date {
            Some(due) => due.map(format_iso_date),
            None => task.due_date.clone(),
        };
        let record = sqlx::query_as::<_, TaskRecord>(&format!(
            r#"UPDATE task SET
                title = COALESCE($1, title),
                completed = COALESCE($2, completed),
                due_date = $3
            WHERE id = $4
            RETURNING {TASK_COLUMNS}"#
        ))
        .bind(update.title.as_deref())
        .bind(update.completed)
        .bind(due_date)
        .bind(task.id)
        .fetch_one(&mut **conn)
        .await?;
        Task::try_from(record)
    }

    async fn delete_task(&self, task: Task) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"DELETE FROM task WHERE id = $1"#)
            .bind(task.id)
            .execute(&mut **conn)
            .await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct NoteRecord {
    id: i64,
    title: String,
    body: String,
    created_at: String,
    sync_status: i64,
}

impl TryFrom<NoteRecord> for Note {
    type Error = anyhow::Error;

    fn try_from(record: NoteRecord) -> Result<Self, Self::Error> {
        Ok(Note {
            id: record.id,
            title: record.title,
            body: record.body,
            created_at: parse_timestamp(&record.created_at)?,
            sync_status: SyncStatus::try_from(record.sync_status)?,
        })
    }
}

impl NoteRepository for ProjectDb {
    async fn get_notes(&self) -> anyhow::Result<Vec<Note>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, NoteRecord>(
            "SELECT id, title, body, created_at, sync_status FROM note ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(Note::try_from)
        .collect()
    }

    async fn get_note_by_id(&self, id: i64) -> anyhow::Result<Option<Note>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, NoteRecord>("SELECT id, title, body, created_at, sync_status FROM note WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **conn)
            .await?
            .map(Note::try_from)
            .transpose()
    }

    async fn add_note(&self, note: &NewNote) -> anyhow::Result<Note> {
        let mut conn = self.state.conn().await?;
        let created_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let record = sqlx::query_as::<_, NoteRecord>(
            r#"INSERT INTO note (title, body, created_at) VALUES ($1, $2, $3)
            RETURNING id, title, body, created_at, sync_status"#,
        )
        .bind(&note.title)
        .bind(&note.body)
        .bind(created_at)
        .fetch_one(&mut **conn)
        .await?;
        Note::try_from(record)
    }

    async fn delete_note(&self, note: Note) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"DELETE FROM note WHERE id = $1"#)
            .bind(note.id)
            .execute(&mut **conn)
            .await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: i64,
    name: String,
    category: String,
    file_name: String,
    added_at: String,
    sync_status: i64,
}

impl TryFrom<DocumentRecord> for Document {
    type Error = anyhow::Error;

    fn try_from(record: DocumentRecord) -> Result<Self, Self::Error> {
        Ok(Document {
            id: record.id,
            name: record.name,
            category: record.category,
            file_name: record.file_name,
            added_at: parse_timestamp(&record.added_at)?,
            sync_status: SyncStatus::try_from(record.sync_status)?,
        })
    }
}

#[derive(FromRow)]
struct PhotoRecord {
    id: i64,
    caption: String,
    taken_on: Option<String>,
    file_name: String,
    added_at: String,
    sync_status: i64,
}

impl TryFrom<PhotoRecord> for Photo {
    type Error = anyhow::Error;

    fn try_from(record: PhotoRecord) -> Result<Self, Self::Error> {
        Ok(Photo {
            id: record.id,
            caption: record.caption,
            taken_on: record.taken_on,
            file_name: record.file_name,
            added_at: parse_timestamp(&record.added_at)?,
            sync_status: SyncStatus::try_from(record.sync_status)?,
        })
    }
}

impl AttachmentRepository for ProjectDb {
    async fn get_documents(&self) -> anyhow::Result<Vec<Document>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, name, category, file_name, added_at, sync_status FROM document ORDER BY id ASC",
        )
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(Document::try_from)
        .collect()
    }

    async fn get_document_by_id(&self, id: i64) -> anyhow::Result<Option<Document>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, name, category, file_name, added_at, sync_status FROM document WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **conn)
        .await?
        .map(Document::try_from)
        .transpose()
    }

    async fn add_document(&self, document: &NewDocument) -> anyhow::Result<Document> {
        let file_name = self.state.store_attachment(&document.source_path).await?;
        let added_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let mut conn = self.state.conn().await?;
        let record = sqlx::query_as::<_, DocumentRecord>(
            r#"INSERT INTO document (name, category, file_name, added_at) VALUES ($1, $2, $3, $4)
            RETURNING id, name, category, file_name, added_at, sync_status"#,
        )
        .bind(&document.name)
        .bind(&document.category)
        .bind(&file_name)
        .bind(added_at)
        .fetch_one(&mut **conn)
        .await?;
        Document::try_from(record)
    }

    async fn delete_document(&self, document: Document) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"DELETE FROM document WHERE id = $1"#)
            .bind(document.id)
            .execute(&mut **conn)
            .await?;
        drop(conn);
        self.state.delete_attachment(&document.file_name).await
    }

    async fn get_photos(&self) -> anyhow::Result<Vec<Photo>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, PhotoRecord>(
            "SELECT id, caption, taken_on, file_name, added_at, sync_status FROM photo ORDER BY taken_on IS NULL, taken_on DESC, id DESC",
        )
        .fetch_all(&mut **conn)
        .await?
        .into_iter()
        .map(Photo::try_from)
        .collect()
    }

    async fn get_photo_by_id(&self, id: i64) -> anyhow::Result<Option<Photo>> {
        let mut conn = self.state.conn().await?;
        sqlx::query_as::<_, PhotoRecord>(
            "SELECT id, caption, taken_on, file_name, added_at, sync_status FROM photo WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **conn)
        .await?
        .map(Photo::try_from)
        .transpose()
    }

    async fn add_photo(&self, photo: &NewPhoto) -> anyhow::Result<Photo> {
        let file_name = self.state.store_attachment(&photo.source_path).await?;
        let added_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
        let mut conn = self.state.conn().await?;
        let record = sqlx::query_as::<_, PhotoRecord>(
            r#"INSERT INTO photo (caption, taken_on, file_name, added_at) VALUES ($1, $2, $3, $4)
            RETURNING id, caption, taken_on, file_name, added_at, sync_status"#,
        )
        .bind(&photo.caption)
        .bind(photo.taken_on.map(format_iso_date))
        .bind(&file_name)
        .bind(added_at)
        .fetch_one(&mut **conn)
        .await?;
        Photo::try_from(record)
    }

    async fn delete_photo(&self, photo: Photo) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(r#"DELETE FROM photo WHERE id = $1"#)
            .bind(photo.id)
            .execute(&mut **conn)
            .await?;
        drop(conn);
        self.state.delete_attachment(&photo.file_name).await
    }

    fn attachment_path(&self, file_name: &str) -> PathBuf {
        self.state.attachment_path(file_name)
    }
}
