//! Application state: the project store, the optional remote, and the
//! current immutable snapshot of every collection.

use std::sync::Arc;

use anyhow::Context;
use futures::future::join_all;
use serde::Serialize;
use time::Date;

use crate::assistant::ExtractionReport;
use crate::core::db::{
    AttachmentRepository, Document, EntityKind, Milestone, MilestoneRepository, MilestoneUpdate, NewDocument,
    NewMilestone, NewNote, NewPhase, NewPhoto, NewTask, Note, NoteRepository, Phase, PhaseRepository, PhaseUpdate,
    Photo, ProjectDb, SyncStatus, Task, TaskRepository, TaskUpdate, UnsyncedEntity,
};
use crate::inference::{MilestoneText, infer_phase};
use crate::sync::{MilestoneRow, PhaseRow, RemoteStore, RemoteSync, SyncEntity};
use crate::timeline::{TimelineLayout, Timeline, Zoom};

/// Read-only view of the project at one point in time.
///
/// Cloning is cheap; a snapshot never changes after it was handed out.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub phases: Arc<[Phase]>,
    pub milestones: Arc<[Milestone]>,
    pub tasks: Arc<[Task]>,
    pub notes: Arc<[Note]>,
    pub documents: Arc<[Document]>,
    pub photos: Arc<[Photo]>,
}

impl Snapshot {
    pub fn phase(&self, id: i64) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }

    pub fn milestone(&self, id: i64) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }
}

/// Result of a mutation: the value written and the snapshot after it.
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub value: T,
    pub snapshot: Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: i64,
    pub reason: String,
}

/// Per-entity result of a bulk operation. There is no atomicity: entries in
/// `applied` were written locally whatever happened to the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub applied: Vec<(i64, SyncStatus)>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    /// Ids written locally whose remote write failed.
    pub fn remote_failures(&self) -> impl Iterator<Item = i64> + '_ {
        self.applied
            .iter()
            .filter(|(_, status)| *status == SyncStatus::Failed)
            .map(|(id, _)| *id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PullSummary {
    pub phases: usize,
    pub milestones: usize,
}

pub struct Workspace<R> {
    db: ProjectDb,
    sync: RemoteSync<R>,
    snapshot: Snapshot,
}

impl<R: RemoteStore> Workspace<R> {
    pub async fn open(db: ProjectDb, remote: Option<R>) -> anyhow::Result<Self> {
        let mut workspace = Self {
            db,
            sync: RemoteSync::new(remote),
            snapshot: Snapshot::default(),
        };
        workspace.refresh().await?;
        Ok(workspace)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.clone()
    }

    pub fn db(&self) -> &ProjectDb {
        &self.db
    }

    pub fn is_remote_configured(&self) -> bool {
        self.sync.is_configured()
    }

    pub async fn save(&self) -> anyhow::Result<()> {
        self.db.save_project().await
    }

    /// Reload every collection from the store.
    pub async fn refresh(&mut self) -> anyhow::Result<Snapshot> {
        self.snapshot = Snapshot {
            phases: self.db.get_phases().await?.into(),
            milestones: self.db.get_milestones().await?.into(),
            tasks: self.db.get_tasks().await?.into(),
            notes: self.db.get_notes().await?.into(),
            documents: self.db.get_documents().await?.into(),
            photos: self.db.get_photos().await?.into(),
        };
        Ok(self.snapshot.clone())
    }

    async fn applied<T>(&mut self, value: T) -> anyhow::Result<Applied<T>> {
        let snapshot = self.refresh().await?;
        Ok(Applied { value, snapshot })
    }

    async fn mirror_insert<E: SyncEntity>(&self, entity: &E) -> anyhow::Result<SyncStatus> {
        let status = self.sync.push_insert(entity).await;
        self.db.set_sync_status(E::KIND, entity.id(), status).await?;
        Ok(status)
    }

    /// `entity` carries the status of its previous push, which decides
    /// between a patch and an upsert.
    async fn mirror_update<E: SyncEntity>(&self, entity: &E) -> anyhow::Result<SyncStatus> {
        let status = self.sync.push_update(entity).await;
        self.db.set_sync_status(E::KIND, entity.id(), status).await?;
        Ok(status)
    }

    /// A failed remote delete is kept as a tombstone so `unsynced` lists it.
    async fn mirror_delete(&self, kind: EntityKind, id: i64) -> anyhow::Result<SyncStatus> {
        let status = self.sync.push_delete(kind, id).await;
        if status == SyncStatus::Failed {
            self.db.record_remote_delete(kind, id).await?;
        }
        Ok(status)
    }

    pub async fn add_phase(&mut self, phase: NewPhase) -> anyhow::Result<Applied<Phase>> {
        let mut phase = self.db.add_phase(&phase).await?;
        phase.sync_status = self.mirror_insert(&phase).await?;
        self.applied(phase).await
    }

    pub async fn update_phase(&mut self, id: i64, update: PhaseUpdate) -> anyhow::Result<Applied<Phase>> {
        let phase = self
            .db
            .get_phase_by_id(id)
            .await?
            .with_context(|| format!("Phase {} not found", id))?;
        let mut phase = self.db.update_phase(&phase, &update).await?;
        phase.sync_status = self.mirror_update(&phase).await?;
        self.applied(phase).await
    }

    /// Milestones in the phase stay where they are and show up as unassigned.
    pub async fn delete_phase(&mut self, id: i64) -> anyhow::Result<Applied<SyncStatus>> {
        let phase = self
            .db
            .get_phase_by_id(id)
            .await?
            .with_context(|| format!("Phase {} not found", id))?;
        self.db.delete_phase(phase).await?;
        let status = self.mirror_delete(EntityKind::Phase, id).await?;
        self.applied(status).await
    }

    /// Phase the engine would pick for a milestone with this text.
    pub fn suggest_phase(&self, title: &str, notes: &str) -> Option<i64> {
        infer_phase(&MilestoneText::new(title, notes), &self.snapshot.phases)
    }

    pub async fn add_milestone(&mut self, milestone: NewMilestone) -> anyhow::Result<Applied<Milestone>> {
        let milestone = self.insert_milestone(&milestone).await?;
        self.applied(milestone).await
    }

    async fn insert_milestone(&self, milestone: &NewMilestone) -> anyhow::Result<Milestone> {
        let mut milestone = self.db.add_milestone(milestone).await?;
        milestone.sync_status = self.mirror_insert(&milestone).await?;
        Ok(milestone)
    }

    pub async fn update_milestone(&mut self, id: i64, update: MilestoneUpdate) -> anyhow::Result<Applied<Milestone>> {
        let milestone = self
            .db
            .get_milestone_by_id(id)
            .await?
            .with_context(|| format!("Milestone {} not found", id))?;
        let mut milestone = self.db.update_milestone(&milestone, &update).await?;
        milestone.sync_status = self.mirror_update(&milestone).await?;
        self.applied(milestone).await
    }

    pub async fn set_milestone_completed(&mut self, id: i64, completed: bool) -> anyhow::Result<Applied<Milestone>> {
        let update = MilestoneUpdate {
            completed: Some(completed),
            ..Default::default()
        };
        self.update_milestone(id, update).await
    }

    pub async fn delete_milestone(&mut self, id: i64) -> anyhow::Result<Applied<SyncStatus>> {
        let milestone = self
            .db
            .get_milestone_by_id(id)
            .await?
            .with_context(|| format!("Milestone {} not found", id))?;
        self.db.delete_milestone(milestone).await?;
        let status = self.mirror_delete(EntityKind::Milestone, id).await?;
        self.applied(status).await
    }

    /// Move several milestones to `phase_id` (`None` unassigns them).
    ///
    /// Local writes run one after another; the remote updates are sent
    /// concurrently, one request per milestone.
    pub async fn reassign_phase(&mut self, ids: &[i64], phase_id: Option<i64>) -> anyhow::Result<Applied<BulkOutcome>> {
        if let Some(phase_id) = phase_id
            && self.db.get_phase_by_id(phase_id).await?.is_none()
        {
            anyhow::bail!("Phase {} not found", phase_id);
        }

        let mut outcome = BulkOutcome::default();
        let mut updated = Vec::with_capacity(ids.len());
        let update = MilestoneUpdate {
            phase_id: Some(phase_id),
            ..Default::default()
        };
        for &id in ids {
            match self.db.get_milestone_by_id(id).await? {
                Some(milestone) => match self.db.update_milestone(&milestone, &update).await {
                    Ok(milestone) => updated.push(milestone),
                    Err(e) => outcome.failed.push(BulkFailure {
                        id,
                        reason: format!("{:#}", e),
                    }),
                },
                None => outcome.failed.push(BulkFailure {
                    id,
                    reason: "not found".to_string(),
                }),
            }
        }

        let statuses = join_all(updated.iter().map(|m| self.sync.push_update(m))).await;
        for (milestone, status) in updated.iter().zip(statuses) {
            self.db.set_sync_status(EntityKind::Milestone, milestone.id, status).await?;
            outcome.applied.push((milestone.id, status));
        }
        tracing::info!(
            applied = outcome.applied.len(),
            failed = outcome.failed.len(),
            ?phase_id,
            "Reassigned milestones"
        );
        self.applied(outcome).await
    }

    pub async fn delete_milestones(&mut self, ids: &[i64]) -> anyhow::Result<Applied<BulkOutcome>> {
        let mut outcome = BulkOutcome::default();
        let mut deleted = Vec::with_capacity(ids.len());
        for &id in ids {
            let Some(milestone) = self.db.get_milestone_by_id(id).await? else {
                outcome.failed.push(BulkFailure {
                    id,
                    reason: "not found".to_string(),
                });
                continue;
            };
            match self.db.delete_milestone(milestone).await {
                Ok(()) => deleted.push(id),
                Err(e) => outcome.failed.push(BulkFailure {
                    id,
                    reason: format!("{:#}", e),
                }),
            }
        }

        let statuses = join_all(
            deleted
                .iter()
                .map(|&id| self.sync.push_delete(EntityKind::Milestone, id)),
        )
        .await;
        for (id, status) in deleted.into_iter().zip(statuses) {
            if status == SyncStatus::Failed {
                self.db.record_remote_delete(EntityKind::Milestone, id).await?;
            }
            outcome.applied.push((id, status));
        }
        tracing::info!(
            applied = outcome.applied.len(),
            failed = outcome.failed.len(),
            "Deleted milestones"
        );
        self.applied(outcome).await
    }

    /// Insert the accepted milestones of an extraction run.
    pub async fn import_extraction(&mut self, report: &ExtractionReport) -> anyhow::Result<Applied<Vec<Milestone>>> {
        let mut inserted = Vec::with_capacity(report.accepted.len());
        for milestone in &report.accepted {
            inserted.push(self.insert_milestone(milestone).await?);
        }
        tracing::info!(
            inserted = inserted.len(),
            rejected = report.rejected.len(),
            "Imported extracted milestones"
        );
        self.applied(inserted).await
    }

    pub async fn add_task(&mut self, task: NewTask) -> anyhow::Result<Applied<Task>> {
        if let Some(milestone_id) = task.milestone_id
            && self.snapshot.milestone(milestone_id).is_none()
        {
            anyhow::bail!("Milestone {} not found", milestone_id);
        }
        let mut task = self.db.add_task(&task).await?;
        task.sync_status = self.mirror_insert(&task).await?;
        self.applied(task).await
    }

    pub async fn update_task(&mut self, id: i64, update: TaskUpdate) -> anyhow::Result<Applied<Task>> {
        let task = self
            .db
            .get_task_by_id(id)
            .await?
            .with_context(|| format!("Task {} not found", id))?;
        let mut task = self.db.update_task(&task, &update).await?;
        task.sync_status = self.mirror_update(&task).await?;
        self.applied(task).await
    }

    pub async fn delete_task(&mut self, id: i64) -> anyhow::Result<Applied<SyncStatus>> {
        let task = self
            .db
            .get_task_by_id(id)
            .await?
            .with_context(|| format!("Task {} not found", id))?;
        self.db.delete_task(task).await?;
        let status = self.mirror_delete(EntityKind::Task, id).await?;
        self.applied(status).await
    }

    pub async fn tasks_due(&self, day: Date) -> anyhow::Result<Vec<Task>> {
        self.db.get_tasks_due(day).await
    }

    pub async fn add_note(&mut self, note: NewNote) -> anyhow::Result<Applied<Note>> {
        let mut note = self.db.add_note(&note).await?;
        note.sync_status = self.mirror_insert(&note).await?;
        self.applied(note).await
    }

    pub async fn delete_note(&mut self, id: i64) -> anyhow::Result<Applied<SyncStatus>> {
        let note = self
            .db
            .get_note_by_id(id)
            .await?
            .with_context(|| format!("Note {} not found", id))?;
        self.db.delete_note(note).await?;
        let status = self.mirror_delete(EntityKind::Note, id).await?;
        self.applied(status).await
    }

    pub async fn add_document(&mut self, document: NewDocument) -> anyhow::Result<Applied<Document>> {
        let mut document = self.db.add_document(&document).await?;
        document.sync_status = self.mirror_insert(&document).await?;
        self.applied(document).await
    }

    pub async fn delete_document(&mut self, id: i64) -> anyhow::Result<Applied<SyncStatus>> {
        let document = self
            .db
            .get_document_by_id(id)
            .await?
            .with_context(|| format!("Document {} not found", id))?;
        self.db.delete_document(document).await?;
        let status = self.mirror_delete(EntityKind::Document, id).await?;
        self.applied(status).await
    }

    pub async fn add_photo(&mut self, photo: NewPhoto) -> anyhow::Result<Applied<Photo>> {
        let mut photo = self.db.add_photo(&photo).await?;
        photo.sync_status = self.mirror_insert(&photo).await?;
        self.applied(photo).await
    }

    pub async fn delete_photo(&mut self, id: i64) -> anyhow::Result<Applied<SyncStatus>> {
        let photo = self
            .db
            .get_photo_by_id(id)
            .await?
            .with_context(|| format!("Photo {} not found", id))?;
        self.db.delete_photo(photo).await?;
        let status = self.mirror_delete(EntityKind::Photo, id).await?;
        self.applied(status).await
    }

    /// Overwrite local phases and milestones with the remote rows.
    ///
    /// Rows with the same id are replaced, local-only rows are kept. Nothing
    /// is merged. Pending remote deletes of phases and milestones are
    /// dropped, since a row the remote still holds comes back locally.
    pub async fn pull(&mut self) -> anyhow::Result<Applied<PullSummary>> {
        let Some(phases) = self.sync.load::<PhaseRow>(EntityKind::Phase).await? else {
            anyhow::bail!("No remote backend configured");
        };
        let milestones = self
            .sync
            .load::<MilestoneRow>(EntityKind::Milestone)
            .await?
            .unwrap_or_default();

        let summary = PullSummary {
            phases: phases.len(),
            milestones: milestones.len(),
        };
        for row in phases {
            self.db.upsert_phase(&Phase::from(row)).await?;
        }
        for row in milestones {
            self.db.upsert_milestone(&Milestone::from(row)).await?;
        }
        self.db.clear_remote_deletes(EntityKind::Phase).await?;
        self.db.clear_remote_deletes(EntityKind::Milestone).await?;
        tracing::info!(phases = summary.phases, milestones = summary.milestones, "Pulled remote rows");
        self.applied(summary).await
    }

    pub async fn unsynced(&self) -> anyhow::Result<Vec<UnsyncedEntity>> {
        self.db.get_unsynced().await
    }

    /// Timeline layout of the current snapshot.
    pub fn timeline(&self, zoom: Zoom, today: Date) -> TimelineLayout {
        let milestones = &self.snapshot.milestones;
        Timeline::for_milestones(milestones, zoom, today).layout(milestones, &self.snapshot.phases, today)
    }
}
