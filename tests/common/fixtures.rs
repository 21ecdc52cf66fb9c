#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use sitetrack::assistant::{ChatError, ChatModel, ChatRequest};
use sitetrack::core::db::{Color, NewMilestone, NewPhase, ProjectDb, Schedule};
use sitetrack::sync::MemoryRemote;
use sitetrack::Workspace;
use tempfile::NamedTempFile;
use time::Date;

/// Creates a ProjectDb with a temporary tar.zst file.
/// Returns both the project and the temp directory (which must be kept alive).
pub async fn create_test_project() -> (ProjectDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("test.sitetrack");
    let project = ProjectDb::new(&path)
        .await
        .expect("Failed to create test project");
    (project, dir)
}

/// Workspace over a fresh project, mirrored to `remote` if given.
pub async fn create_test_workspace(
    remote: Option<MemoryRemote>,
) -> (Workspace<MemoryRemote>, tempfile::TempDir) {
    let (project, dir) = create_test_project().await;
    let workspace = Workspace::open(project, remote)
        .await
        .expect("Failed to open workspace");
    (workspace, dir)
}

/// Writes `contents` to a temp file with the given suffix.
/// The file will be automatically cleaned up when dropped.
pub fn create_test_file(suffix: &str, contents: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents).expect("Failed to write temp file");
    file
}

pub fn make_new_phase(name: &str, color: Color) -> NewPhase {
    NewPhase {
        name: name.to_string(),
        color,
    }
}

pub fn make_new_milestone(title: &str, start: Date, end: Date, phase_id: Option<i64>) -> NewMilestone {
    NewMilestone {
        title: title.to_string(),
        schedule: Schedule::new(start, end),
        phase_id,
        notes: String::new(),
    }
}

/// Color constants for tests
pub const TEST_BROWN: Color = Color { r: 0x8b, g: 0x45, b: 0x13 };
pub const TEST_RED: Color = Color { r: 255, g: 0, b: 0 };
pub const TEST_BLUE: Color = Color { r: 0, g: 0, b: 255 };

/// Chat model that answers every request with a fixed reply and records
/// the prompts it was sent.
pub struct CannedModel {
    reply: Result<String, ChatError>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl CannedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn failing(error: ChatError) -> Self {
        Self {
            reply: Err(error),
            prompts: Arc::default(),
        }
    }
}

impl ChatModel for CannedModel {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, ChatError> {
        self.prompts.lock().unwrap().push(request.user.to_string());
        self.reply.clone()
    }
}
