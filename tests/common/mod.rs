mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from sitetrack for tests
pub use sitetrack::core::db::{
    AttachmentRepository, Color, EntityKind, Milestone, MilestoneRepository, MilestoneUpdate, NewDocument,
    NewMilestone, NewNote, NewPhase, NewPhoto, NewTask, NoteRepository, Phase, PhaseRepository, PhaseUpdate,
    ProjectDb, ProjectRepository, Schedule, SyncStatus, Task, TaskRepository, TaskUpdate,
};
pub use sitetrack::sync::MemoryRemote;
pub use sitetrack::{BulkOutcome, Snapshot, Workspace};
