use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Name prefix of every temp file created by [`temp_file_in`].
pub const TEMP_PREFIX: &str = ".tmp_";

/// Write atomically: either fully succeeds or fully fails.
///
/// The contents land in a temporary file next to `file_path` and are renamed over it,
/// so a crash never leaves a half-written record behind.
pub fn write<P: AsRef<Path>>(file_path: P, contents: impl AsRef<[u8]>) -> io::Result<()> {
    let file_path = file_path.as_ref();
    let mut temp = temp_file_in(parent_of(file_path)?)?;

    temp.write_all(contents.as_ref())?;
    temp.as_file().sync_all()?;
    temp.persist(file_path).map_err(|e| e.error)?;
    Ok(())
}

/// Write atomically, creating all leading directories.
pub fn create_dirs_then_write<P: AsRef<Path>>(
    file_path: P,
    contents: impl AsRef<[u8]>,
) -> io::Result<()> {
    let file_path = file_path.as_ref();
    fs::create_dir_all(parent_of(file_path)?)?;
    write(file_path, contents)
}

/// Read a file to a string, mapping "not found" to `None`.
///
/// Every other I/O failure is returned as-is so callers can tell a missing record
/// apart from one they could not read.
pub fn read_to_string_optional<P: AsRef<Path>>(path: P) -> io::Result<Option<String>> {
    match fs::read_to_string(path.as_ref()) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Remove a file, treating an already-missing file as success.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> io::Result<()> {
    match fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Create a hidden temp file inside `dir`, named `.tmp_<pid>__<random>`.
///
/// The file is deleted when the handle (or its `TempPath`) is dropped, unless it has been
/// persisted. Persisting onto a sibling path is a same-filesystem rename.
pub fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(&format!("{}{}__", TEMP_PREFIX, std::process::id()))
        .tempfile_in(dir)
}

/// Remove temp files left in `dir` by a process that died before cleaning up.
///
/// A missing directory has nothing to sweep. Returns how many files were removed.
pub fn sweep_temp_files(dir: &Path) -> io::Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let is_temp = entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX);
        if !is_temp || !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        match remove_if_exists(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed stale temp file");
                removed += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Could not remove stale temp file");
            }
        }
    }
    Ok(removed)
}

fn parent_of(file_path: &Path) -> io::Result<&Path> {
    match file_path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Ok(Path::new(".")),
        Some(parent) => Ok(parent),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "File path has no parent directory",
        )),
    }
}
