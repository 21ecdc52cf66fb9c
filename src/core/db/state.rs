use sqlx::{
    Sqlite,
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous},
};
use tempdir::TempDir;
use tokio::{
    fs as async_fs,
    sync::{RwLock, RwLockReadGuard},
};

use anyhow::Context;
use std::{
    fs::{self, File},
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};
use uuid::Uuid;

use tar::{Archive, Builder};
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

const DB_FILE_NAME: &str = "project.db";
const ATTACHMENT_DIR_NAME: &str = "attachments";

/// Unpacked project: a SQLite database plus an attachment directory living in
/// a temp dir, packed back into a tar.zst archive on save.
pub(super) struct ProjectState {
    project_file: PathBuf,
    working_dir: TempDir,
    pool: RwLock<SqlitePool>,
}

impl std::fmt::Debug for ProjectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectState")
            .field("project_file", &self.project_file)
            .field("working_dir", &self.working_dir.path())
            .finish()
    }
}

fn connect_options(db_file: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_file)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
}

impl ProjectState {
    /// Acquire a pooled connection and hold the pool read lock for the entire lifetime
    /// of the returned guard.
    pub(super) async fn conn(&self) -> anyhow::Result<DbConnGuard<'_>> {
        let pool_guard = self.pool.read().await;

        // The read lock must be held while acquiring, the guard keeps it alive.
        let conn = pool_guard.acquire().await?;

        Ok(DbConnGuard {
            _pool_guard: pool_guard,
            conn,
        })
    }

    pub(super) fn attachment_path(&self, file_name: &str) -> PathBuf {
        self.working_dir
            .path()
            .join(ATTACHMENT_DIR_NAME)
            .join(file_name)
    }

    /// Copy a file into the project, returning the stored file name.
    pub(super) async fn store_attachment<P: AsRef<Path>>(&self, src: P) -> anyhow::Result<String> {
        let src = src.as_ref();
        let file_name = match src.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let dest_path = self.attachment_path(&file_name);
        async_fs::copy(src, &dest_path).await.with_context(|| {
            format!("Failed to copy attachment from {:?} to {:?}", src, dest_path)
        })?;
        Ok(file_name)
    }

    pub(super) async fn delete_attachment(&self, file_name: &str) -> anyhow::Result<()> {
        let path = self.attachment_path(file_name);
        async_fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete attachment {:?}", path))?;
        Ok(())
    }

    /// Create a tar.zst archive from the working directory.
    fn save_tar_zstd(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.project_file.parent() {
            fs::create_dir_all(parent)?;
        }

        let out = File::create(&self.project_file)
            .with_context(|| format!("Failed to create project archive {:?}", self.project_file))?;
        let encoder = ZstdEncoder::new(out, 3)
            .with_context(|| format!("Failed to create zstd encoder for {:?}", self.project_file))?;
        let mut tar = Builder::new(encoder);

        tar.append_dir_all(".", self.working_dir.path())
            .with_context(|| format!("Failed to add {:?} to tar", self.working_dir.path()))?;

        let encoder = tar
            .into_inner()
            .with_context(|| format!("Failed to finalize tar for {:?}", self.project_file))?;
        encoder
            .finish()
            .with_context(|| format!("Failed to finalize zstd stream for {:?}", self.project_file))?;

        Ok(())
    }

    /// Exclusive close+pack:
    /// - waits for all in-flight queries (takes the WRITE lock)
    /// - checkpoints the WAL so project.db is current
    /// - closes the pool to release file handles
    /// - archives the working dir
    pub(super) async fn save_project(&self) -> anyhow::Result<()> {
        self.internal_close_and_pack(true).await
    }

    pub(super) async fn internal_close_and_pack(&self, reopen: bool) -> anyhow::Result<()> {
        let mut pool_guard = self.pool.write().await;

        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&*pool_guard)
            .await?;

        pool_guard.close().await;

        // Synchronous IO; fine for project sizes we deal with.
        self.save_tar_zstd()?;

        if reopen {
            let db_file = self.working_dir.path().join(DB_FILE_NAME);
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(connect_options(&db_file))
                .await?;
            *pool_guard = pool;
        }
        tracing::debug!(project_file = ?self.project_file, "Project saved");
        Ok(())
    }

    pub(super) async fn new<P: AsRef<Path>>(project_file: P) -> anyhow::Result<Self> {
        let project_file = project_file.as_ref().to_path_buf();

        // A missing project file becomes an empty archive, as long as its directory exists.
        if !project_file.is_file() {
            if project_file.parent().map(|p| p.is_dir()).unwrap_or(false) {
                let out = File::create(&project_file)
                    .with_context(|| format!("Failed to create project archive {:?}", project_file))?;
                let encoder = ZstdEncoder::new(out, 3)
                    .with_context(|| format!("Failed to create zstd encoder for {:?}", project_file))?;
                let tar = Builder::new(encoder);
                let encoder = tar
                    .into_inner()
                    .with_context(|| format!("Failed to finalize empty tar {:?}", project_file))?;
                encoder
                    .finish()
                    .with_context(|| format!("Failed to finalize empty zstd stream {:?}", project_file))?;
                tracing::info!(?project_file, "Created new project");
            } else {
                anyhow::bail!("Project file parent does not exist: {:?}", project_file);
            }
        }

        let working_dir = TempDir::new("sitetrack_project")?;

        {
            let f = File::open(&project_file)
                .with_context(|| format!("Failed to open project archive {:?}", project_file))?;
            let decoder = ZstdDecoder::new(f)
                .with_context(|| format!("Invalid zstd stream in {:?}", project_file))?;
            let mut archive = Archive::new(decoder);
            archive.unpack(working_dir.path()).with_context(|| {
                format!(
                    "Failed to extract archive {:?} into {:?}",
                    project_file,
                    working_dir.path()
                )
            })?;
        }

        let db_file = working_dir.path().join(DB_FILE_NAME);
        let attachments_dir = working_dir.path().join(ATTACHMENT_DIR_NAME);

        match (db_file.is_file(), attachments_dir.is_dir()) {
            (true, true) => {}
            (false, false) => {
                fs::create_dir_all(&attachments_dir)?;
                File::create(&db_file)?;
            }
            (true, false) => anyhow::bail!(
                "Corrupt project: database exists ({:?}) but attachments dir missing ({:?})",
                db_file,
                attachments_dir
            ),
            (false, true) => anyhow::bail!(
                "Corrupt project: attachments dir exists ({:?}) but database missing ({:?})",
                attachments_dir,
                db_file
            ),
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options(&db_file))
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            project_file,
            working_dir,
            pool: RwLock::new(pool),
        })
    }
}

pub struct DbConnGuard<'a> {
    _pool_guard: RwLockReadGuard<'a, SqlitePool>,
    conn: PoolConnection<Sqlite>,
}

impl<'a> Deref for DbConnGuard<'a> {
    type Target = PoolConnection<Sqlite>;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<'a> DerefMut for DbConnGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for ProjectState {
    fn drop(&mut self) {
        // Blocking on a runtime from inside one is not possible; async callers
        // are expected to call save_project() before dropping.
        if tokio::runtime::Handle::try_current().is_ok() {
            return;
        }
        let result = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(async { self.internal_close_and_pack(false).await }),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to save project on drop");
        }
    }
}
