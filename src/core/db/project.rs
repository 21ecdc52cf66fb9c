use std::future::Future;

use time::OffsetDateTime;

#[derive(Debug, Clone, Default)]
pub struct UpdateProjectSettings {
    pub name: Option<String>,
    pub created_at: Option<OffsetDateTime>,
}

pub trait ProjectRepository {
    fn get_project_name(&self) -> impl Future<Output = anyhow::Result<String>>;
    fn get_project_created_at(&self) -> impl Future<Output = anyhow::Result<OffsetDateTime>>;
    fn set_project_settings(&self, settings: UpdateProjectSettings) -> impl Future<Output = anyhow::Result<()>>;
}
