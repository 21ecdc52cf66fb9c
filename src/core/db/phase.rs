use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::core::db::model::{Color, SyncStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: i64,
    pub name: String,
    pub color: Color,
    #[serde(skip, default = "default_status")]
    pub sync_status: SyncStatus,
}

pub(crate) fn default_status() -> SyncStatus {
    SyncStatus::Pending
}

#[derive(Debug, Clone)]
pub struct NewPhase {
    pub name: String,
    pub color: Color,
}

#[derive(Debug, Clone, Default)]
pub struct PhaseUpdate {
    pub name: Option<String>,
    pub color: Option<Color>,
}

pub trait PhaseRepository {
    fn get_phases(&self) -> impl Future<Output = anyhow::Result<Vec<Phase>>>;
    fn get_phase_by_id(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<Phase>>>;
    fn add_phase(&self, phase: &NewPhase) -> impl Future<Output = anyhow::Result<Phase>>;
    fn update_phase(&self, phase: &Phase, update: &PhaseUpdate) -> impl Future<Output = anyhow::Result<Phase>>;
    /// Insert or overwrite a phase that already carries an id (remote pull).
    fn upsert_phase(&self, phase: &Phase) -> impl Future<Output = anyhow::Result<()>>;
    /// Milestones pointing at the phase are left alone and become unassigned.
    fn delete_phase(&self, phase: Phase) -> impl Future<Output = anyhow::Result<()>>;
}
