use std::{
    fs::File,
    path::{Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use tracing::debug;

use crate::{BackupError, BackupResult, SnapshotWriter};

/// Gzip-compressed tarball writer.
///
/// Entries are stored under the source directory's own name, so unpacking an archive
/// of `./world` recreates `world/`.
#[derive(Debug, Clone)]
pub struct TarGzWriter {
    level: Compression,
}

impl TarGzWriter {
    pub fn new(level: Compression) -> Self {
        Self { level }
    }
}

impl Default for TarGzWriter {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

impl SnapshotWriter for TarGzWriter {
    fn write_snapshot(&self, source: &Path, dest: &Path) -> BackupResult<()> {
        let root = source
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("world"));

        let file = File::create(dest).map_err(|e| BackupError::io(dest, e))?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, self.level));
        builder.follow_symlinks(false);
        builder
            .append_dir_all(&root, source)
            .map_err(|e| BackupError::io(source, e))?;

        let file = builder
            .into_inner()
            .and_then(GzEncoder::finish)
            .map_err(|e| BackupError::io(dest, e))?;
        file.sync_all().map_err(|e| BackupError::io(dest, e))?;

        debug!(source = %source.display(), dest = %dest.display(), "Snapshot archived");
        Ok(())
    }
}
