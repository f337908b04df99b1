use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{PersistError, PersistResult, layout::VERSION_FILE};

/// The single installed-version slot.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(VERSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The recorded version id, or `None` when nothing has been installed yet.
    ///
    /// An empty record is returned as `Some("")`; only a missing file is `None`.
    pub fn read(&self) -> PersistResult<Option<String>> {
        let contents = keeper_fs::read_to_string_optional(&self.path)
            .map_err(|e| PersistError::read(&self.path, e))?;

        let version = contents.map(|c| c.trim_end().to_string());
        debug!(path = %self.path.display(), ?version, "Read installed version");
        Ok(version)
    }

    pub fn write(&self, version_id: &str) -> PersistResult<()> {
        keeper_fs::create_dirs_then_write(&self.path, version_id)
            .map_err(|e| PersistError::write(&self.path, e))?;
        debug!(path = %self.path.display(), version = version_id, "Recorded installed version");
        Ok(())
    }
}
