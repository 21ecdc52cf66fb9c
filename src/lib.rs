pub mod assistant;
pub mod config;
pub mod core;
pub mod inference;
pub mod sync;
pub mod timeline;
pub mod workspace;

pub use config::Config;
pub use workspace::{Applied, BulkFailure, BulkOutcome, PullSummary, Snapshot, Workspace};
