use std::{path::PathBuf, time::Duration};

use keeper_state::PersistError;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("server artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("spawned server reported no pid")]
    NoPid,

    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, thiserror::Error)]
pub enum StopError {
    #[error("no process with pid {0}; the pid marker is stale")]
    NotFound(u32),

    #[error("failed to signal pid {pid}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("pid {pid} still alive after {waited:?}")]
    Timeout { pid: u32, waited: Duration },

    #[error(transparent)]
    Persist(#[from] PersistError),
}
