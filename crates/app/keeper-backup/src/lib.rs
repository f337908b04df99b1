//! Snapshots of the world directory, taken before a server version is replaced.

mod error;
mod tar_gz;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use keeper_state::layout;
use tracing::{info, instrument};

pub use error::{BackupError, BackupResult};
pub use tar_gz::TarGzWriter;

/// Archives a directory tree into a single file.
pub trait SnapshotWriter: Send + Sync {
    /// Write an archive of everything under `source`, recursively, to `dest`.
    fn write_snapshot(&self, source: &Path, dest: &Path) -> BackupResult<()>;
}

/// Backs up one source directory into version-tagged archives.
#[derive(Clone)]
pub struct BackupJob {
    writer: Arc<dyn SnapshotWriter>,
    source_dir: PathBuf,
    backup_dir: PathBuf,
}

impl BackupJob {
    pub fn new(
        writer: Arc<dyn SnapshotWriter>,
        source_dir: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            writer,
            source_dir: source_dir.into(),
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn archive_path(&self, version_id: &str) -> PathBuf {
        layout::backup_archive_path(&self.backup_dir, version_id)
    }

    /// Snapshot the source directory ahead of installing `version_id`.
    ///
    /// A missing source directory means there is nothing to protect yet: this returns
    /// `Ok(None)` without touching the backup directory. Otherwise the archive is written
    /// to a temp file and renamed into place, and its path is returned.
    #[instrument(skip(self), fields(source = %self.source_dir.display()))]
    pub fn run(&self, version_id: &str) -> BackupResult<Option<PathBuf>> {
        let source_exists = self
            .source_dir
            .try_exists()
            .map_err(|e| BackupError::io(&self.source_dir, e))?;
        if !source_exists {
            info!("Nothing to back up: source directory does not exist");
            return Ok(None);
        }

        std::fs::create_dir_all(&self.backup_dir)
            .map_err(|e| BackupError::io(&self.backup_dir, e))?;

        let archive = self.archive_path(version_id);
        // Removed on drop, so a failed snapshot leaves nothing behind.
        let temp = keeper_fs::temp_file_in(&self.backup_dir)
            .map_err(|e| BackupError::io(&self.backup_dir, e))?
            .into_temp_path();

        self.writer.write_snapshot(&self.source_dir, &temp)?;
        temp.persist(&archive).map_err(|e| BackupError::io(&archive, e.error))?;

        info!(archive = %archive.display(), "Backup written");
        Ok(Some(archive))
    }
}
