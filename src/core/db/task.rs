use std::future::Future;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::core::db::model::SyncStatus;
use crate::core::db::phase::default_status;

/// A daily to-do item, optionally tied to a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub due_date: Option<String>,
    pub milestone_id: Option<i64>,
    pub completed: bool,
    #[serde(skip, default = "default_status")]
    pub sync_status: SyncStatus,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub due_date: Option<Date>,
    pub milestone_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub due_date: Option<Option<Date>>,
    pub completed: Option<bool>,
}

pub trait TaskRepository {
    fn get_tasks(&self) -> impl Future<Output = anyhow::Result<Vec<Task>>>;
    fn get_tasks_due(&self, day: Date) -> impl Future<Output = anyhow::Result<Vec<Task>>>;
    fn get_task_by_id(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<Task>>>;
    fn add_task(&self, task: &NewTask) -> impl Future<Output = anyhow::Result<Task>>;
    fn update_task(&self, task: &Task, update: &TaskUpdate) -> impl Future<Output = anyhow::Result<Task>>;
    fn delete_task(&self, task: Task) -> impl Future<Output = anyhow::Result<()>>;
}
