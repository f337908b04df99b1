use std::path::PathBuf;

use keeper_backup::BackupError;
use keeper_manifest::FetchError;
use keeper_state::PersistError;
use keeper_supervisor::{LaunchError, StopError};

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("backup failed: {0}")]
    Backup(#[from] BackupError),

    #[error("state record failed: {0}")]
    Persist(#[from] PersistError),

    #[error("could not start server: {0}")]
    Launch(#[from] LaunchError),

    #[error("could not stop server: {0}")]
    Stop(#[from] StopError),

    #[error("shutdown requested")]
    Aborted,
}

/// Failures while installing the log sinks; these end the process.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install tracing subscriber")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_phase() {
        let err = UpdateError::from(StopError::NotFound(42));
        assert_eq!(
            err.to_string(),
            "could not stop server: no process with pid 42; the pid marker is stale"
        );

        let err = UpdateError::from(FetchError::Status {
            url: "https://example.com/versions.json".into(),
            status: 500,
        });
        assert_eq!(
            err.to_string(),
            "fetch failed: https://example.com/versions.json answered with status 500"
        );
    }
}
