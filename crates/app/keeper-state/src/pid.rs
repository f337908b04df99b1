use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{PersistError, PersistResult, layout::PID_FILE};

/// Marker recording the process id of the running server.
///
/// Its presence is what a freshly started supervisor uses to decide that a server is
/// already running.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(PID_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, pid: u32) -> PersistResult<()> {
        keeper_fs::create_dirs_then_write(&self.path, format!("{}\n", pid))
            .map_err(|e| PersistError::write(&self.path, e))?;
        debug!(path = %self.path.display(), pid, "Saved server pid");
        Ok(())
    }

    pub fn load(&self) -> PersistResult<Option<u32>> {
        let Some(contents) = keeper_fs::read_to_string_optional(&self.path)
            .map_err(|e| PersistError::read(&self.path, e))?
        else {
            return Ok(None);
        };

        contents
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| PersistError::Corrupt {
                path: self.path.clone(),
                content: contents,
            })
    }

    pub fn clear(&self) -> PersistResult<()> {
        keeper_fs::remove_if_exists(&self.path).map_err(|e| PersistError::write(&self.path, e))?;
        debug!(path = %self.path.display(), "Cleared server pid");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path());

        assert_eq!(pid_file.load().unwrap(), None);

        pid_file.save(4242).unwrap();
        assert_eq!(pid_file.load().unwrap(), Some(4242));

        pid_file.clear().unwrap();
        assert_eq!(pid_file.load().unwrap(), None);
    }

    #[test]
    fn clearing_an_absent_marker_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        PidFile::new(dir.path()).clear().unwrap();
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path());
        std::fs::write(pid_file.path(), " 77\n").unwrap();

        assert_eq!(pid_file.load().unwrap(), Some(77));
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = PidFile::new(dir.path());
        std::fs::write(pid_file.path(), "not-a-pid").unwrap();

        match pid_file.load() {
            Err(PersistError::Corrupt { content, .. }) => assert_eq!(content, "not-a-pid"),
            other => panic!("expected corrupt marker, got {:?}", other),
        }
    }
}
