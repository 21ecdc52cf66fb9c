use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GRAY: Color = Color { r: 0x9e, g: 0x9e, b: 0x9e };

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> anyhow::Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("Invalid color '{}', expected #rrggbb", hex);
        }
        let value = i64::from_str_radix(digits, 16)?;
        Color::try_from(value)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl TryFrom<i64> for Color {
    type Error = anyhow::Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if !(0..=0xFF_FFFF).contains(&value) {
            anyhow::bail!("Invalid color value: {}", value);
        }
        let r = ((value >> 16) & 0xFF) as u8;
        let g = ((value >> 8) & 0xFF) as u8;
        let b = (value & 0xFF) as u8;
        Ok(Color { r, g, b })
    }
}

impl From<Color> for i64 {
    fn from(color: Color) -> Self {
        ((color.r as i64) << 16) | ((color.g as i64) << 8) | (color.b as i64)
    }
}

/// Where a locally stored entity stands relative to the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Written locally, remote write not attempted yet.
    Pending,
    Synced,
    /// No remote backend is configured.
    LocalOnly,
    /// The remote write failed; local and remote have diverged.
    Failed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::LocalOnly => "local-only",
            SyncStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

impl TryFrom<i64> for SyncStatus {
    type Error = anyhow::Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SyncStatus::Pending),
            1 => Ok(SyncStatus::Synced),
            2 => Ok(SyncStatus::LocalOnly),
            3 => Ok(SyncStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid SyncStatus value: {}", value)),
        }
    }
}

impl From<SyncStatus> for i64 {
    fn from(status: SyncStatus) -> Self {
        match status {
            SyncStatus::Pending => 0,
            SyncStatus::Synced => 1,
            SyncStatus::LocalOnly => 2,
            SyncStatus::Failed => 3,
        }
    }
}

/// Entity kinds that live in their own local table and remote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Phase,
    Milestone,
    Task,
    Note,
    Document,
    Photo,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Phase,
        EntityKind::Milestone,
        EntityKind::Task,
        EntityKind::Note,
        EntityKind::Document,
        EntityKind::Photo,
    ];

    /// Local SQLite table.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Phase => "phase",
            EntityKind::Milestone => "milestone",
            EntityKind::Task => "task",
            EntityKind::Note => "note",
            EntityKind::Document => "document",
            EntityKind::Photo => "photo",
        }
    }

    /// Inverse of [`EntityKind::table`].
    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table() == table)
    }

    /// Remote backend table.
    pub fn remote_table(self) -> &'static str {
        match self {
            EntityKind::Phase => "phases",
            EntityKind::Milestone => "milestones",
            EntityKind::Task => "tasks",
            EntityKind::Note => "notes",
            EntityKind::Document => "documents",
            EntityKind::Photo => "photos",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// An entity whose local copy is not known to match the remote one.
///
/// `deleted` entries are gone locally but their remote delete failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsyncedEntity {
    pub kind: EntityKind,
    pub id: i64,
    pub status: SyncStatus,
    pub deleted: bool,
}
