use std::future::Future;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::core::date::{self, DateError};
use crate::core::db::model::SyncStatus;
use crate::core::db::phase::default_status;

/// A dated piece of work on the project timeline.
///
/// Dates are kept exactly as stored (`YYYY-MM-DD` text). Records can arrive
/// from storage or the remote backend with garbage in them, so they are only
/// validated when a [`Schedule`] is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: i64,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub phase_id: Option<i64>,
    pub notes: String,
    pub completed: bool,
    #[serde(skip, default = "default_status")]
    pub sync_status: SyncStatus,
}

/// Validated start/end pair with `end >= start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub start: Date,
    pub end: Date,
}

impl Schedule {
    /// An end before the start is clamped to the start.
    pub fn new(start: Date, end: Date) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }
}

impl Milestone {
    pub fn schedule(&self) -> Result<Schedule, DateError> {
        let start = date::parse_iso_date(&self.start_date)?;
        let end = date::parse_iso_date(&self.end_date)?;
        if end < start {
            tracing::debug!(
                milestone_id = self.id,
                start = %self.start_date,
                end = %self.end_date,
                "Milestone ends before it starts, clamping end date"
            );
        }
        Ok(Schedule::new(start, end))
    }
}

#[derive(Debug, Clone)]
pub struct NewMilestone {
    pub title: String,
    pub schedule: Schedule,
    pub phase_id: Option<i64>,
    pub notes: String,
}

#[derive(Debug, Clone, Default)]
pub struct MilestoneUpdate {
    pub title: Option<String>,
    pub schedule: Option<Schedule>,
    pub phase_id: Option<Option<i64>>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

pub trait MilestoneRepository {
    fn get_milestones(&self) -> impl Future<Output = anyhow::Result<Vec<Milestone>>>;
    fn get_milestone_by_id(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<Milestone>>>;
    fn add_milestone(&self, milestone: &NewMilestone) -> impl Future<Output = anyhow::Result<Milestone>>;
    fn update_milestone(
        &self,
        milestone: &Milestone,
        update: &MilestoneUpdate,
    ) -> impl Future<Output = anyhow::Result<Milestone>>;
    fn upsert_milestone(&self, milestone: &Milestone) -> impl Future<Output = anyhow::Result<()>>;
    fn delete_milestone(&self, milestone: Milestone) -> impl Future<Output = anyhow::Result<()>>;
}
