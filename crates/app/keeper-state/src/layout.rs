//! File naming shared by the downloader, the backup step and the supervisor.

use std::path::{Path, PathBuf};

pub const VERSION_FILE: &str = "current_version";
pub const PID_FILE: &str = ".pid";

pub fn artifact_file_name(version_id: &str) -> String {
    format!("minecraft_server.{}.jar", version_id)
}

pub fn artifact_path(server_dir: &Path, version_id: &str) -> PathBuf {
    server_dir.join(artifact_file_name(version_id))
}

pub fn backup_archive_name(version_id: &str) -> String {
    format!("{}_backup.tar.gz", version_id)
}

pub fn backup_archive_path(backup_dir: &Path, version_id: &str) -> PathBuf {
    backup_dir.join(backup_archive_name(version_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_derived_from_the_version_id() {
        assert_eq!(artifact_file_name("1.14.4"), "minecraft_server.1.14.4.jar");
        assert_eq!(backup_archive_name("19w34a"), "19w34a_backup.tar.gz");
        assert_eq!(
            artifact_path(Path::new("/srv/mc"), "1.2"),
            PathBuf::from("/srv/mc/minecraft_server.1.2.jar")
        );
        assert_eq!(
            backup_archive_path(Path::new("backups"), "1.2"),
            PathBuf::from("backups/1.2_backup.tar.gz")
        );
    }
}
