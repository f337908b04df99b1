use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use keeper_state::{PidFile, VersionStore, layout};
use tokio::{process::Child, sync::watch};
use tracing::{debug, error, info, instrument, warn};

use crate::{ExitOutcome, LaunchError, Launcher, ProcessState, StopError, signal};

/// How long to wait for the process group to vanish after `SIGKILL`.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// What [`ProcessSupervisor::ensure_running`] found at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    /// A pid marker exists; the server is assumed to still be running.
    Reattached(u32),
    /// The recorded version was started.
    Started(u32),
    /// No version is installed yet, so there is nothing to run.
    Idle,
}

/// Exclusive owner of the one running server process.
pub struct ProcessSupervisor {
    launcher: Arc<dyn Launcher>,
    pid_file: PidFile,
    server_dir: PathBuf,
    stop_timeout: Duration,
    state: Arc<watch::Sender<ProcessState>>,
}

impl ProcessSupervisor {
    pub fn new(
        launcher: Arc<dyn Launcher>,
        server_dir: impl Into<PathBuf>,
        state_dir: impl AsRef<Path>,
        stop_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ProcessState::Absent);
        Self {
            launcher,
            pid_file: PidFile::new(state_dir),
            server_dir: server_dir.into(),
            stop_timeout,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.state.subscribe()
    }

    pub fn pid_file(&self) -> &PidFile {
        &self.pid_file
    }

    /// Bring the server up after a supervisor (re)start.
    ///
    /// A pid marker is trusted as-is: whether that pid is still alive, and still the
    /// server, is not checked.
    pub fn ensure_running(&self, versions: &VersionStore) -> Result<Startup, LaunchError> {
        if let Some(pid) = self.pid_file.load()? {
            info!(pid, "Server already running");
            return Ok(Startup::Reattached(pid));
        }

        match versions.read()? {
            Some(version) => self.start(&version).map(Startup::Started),
            None => {
                warn!("No installed version recorded; nothing to start yet");
                Ok(Startup::Idle)
            }
        }
    }

    /// Spawn the server for `version_id` in its own process group and start watching it.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(skip(self), fields(version = version_id))]
    pub fn start(&self, version_id: &str) -> Result<u32, LaunchError> {
        let artifact = layout::artifact_path(&self.server_dir, version_id);
        if !artifact.is_file() {
            error!(artifact = %artifact.display(), "Server artifact missing");
            return Err(LaunchError::MissingArtifact(artifact));
        }

        self.state.send_replace(ProcessState::Starting);

        let mut command = self.launcher.command(&artifact);
        command
            .current_dir(&self.server_dir)
            .stdin(Stdio::null())
            .process_group(0)
            .kill_on_drop(false);

        let program = command.as_std().get_program().to_string_lossy().into_owned();
        info!(command = ?command.as_std(), "Starting server");

        let mut child = command.spawn().map_err(|source| {
            self.state.send_replace(ProcessState::Absent);
            LaunchError::Spawn { program, source }
        })?;

        let Some(pid) = child.id() else {
            self.state.send_replace(ProcessState::Absent);
            return Err(LaunchError::NoPid);
        };

        if let Err(err) = self.pid_file.save(pid) {
            // Unrecorded children would be invisible to the next supervisor.
            let _ = child.start_kill();
            self.state.send_replace(ProcessState::Absent);
            return Err(err.into());
        }

        self.state.send_replace(ProcessState::Running { pid });
        tokio::spawn(watch_child(child, pid, self.state.clone()));

        info!(pid, "Server running");
        Ok(pid)
    }

    /// Stop the recorded server and clear its pid marker.
    ///
    /// `SIGTERM` goes to the whole process group; after `stop_timeout` the group gets
    /// `SIGKILL`. No marker means nothing to do.
    pub async fn stop(&self) -> Result<(), StopError> {
        let Some(pid) = self.pid_file.load()? else {
            debug!("No server recorded; nothing to stop");
            return Ok(());
        };

        if self.observed_exit(pid) {
            info!(pid, "Server already exited; clearing pid marker");
            self.pid_file.clear()?;
            self.state.send_replace(ProcessState::Absent);
            return Ok(());
        }

        info!(pid, "Stopping server");
        let previous = self.state.send_replace(ProcessState::Stopping { pid });

        if let Err(err) = signal::terminate_group(pid) {
            self.state.send_replace(previous);
            error!(pid, error = %err, "Could not signal server");
            return Err(err);
        }

        if !signal::wait_for_exit(pid, self.stop_timeout).await {
            warn!(pid, timeout = ?self.stop_timeout, "Server ignored SIGTERM; killing");
            match signal::kill_group(pid) {
                Ok(()) | Err(StopError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
            if !signal::wait_for_exit(pid, KILL_GRACE).await {
                return Err(StopError::Timeout {
                    pid,
                    waited: self.stop_timeout.saturating_add(KILL_GRACE),
                });
            }
        }

        self.pid_file.clear()?;
        self.state.send_replace(ProcessState::Absent);
        info!(pid, "Server stopped");
        Ok(())
    }

    fn observed_exit(&self, pid: u32) -> bool {
        matches!(*self.state.borrow(), ProcessState::Exited { pid: exited, .. } if exited == pid)
    }
}

/// Block on the child until it exits and publish the outcome.
///
/// Exit is only published while the state still refers to this pid, so a late watcher
/// never overwrites the state of a newer process.
async fn watch_child(mut child: Child, pid: u32, state: Arc<watch::Sender<ProcessState>>) {
    debug!(pid, "Watching server");

    let outcome = match child.wait().await {
        Ok(status) => ExitOutcome::from(status),
        Err(err) => ExitOutcome::WaitFailed(err.to_string()),
    };

    state.send_if_modified(|current| match *current {
        ProcessState::Stopping { pid: p } if p == pid => {
            info!(pid, %outcome, "Server exited after stop request");
            *current = ProcessState::Exited {
                pid,
                outcome: outcome.clone(),
            };
            true
        }
        ProcessState::Running { pid: p } if p == pid => {
            warn!(pid, %outcome, "Server exited unexpectedly");
            *current = ProcessState::Exited {
                pid,
                outcome: outcome.clone(),
            };
            true
        }
        _ => {
            debug!(pid, %outcome, "Superseded server exited");
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use tokio::process::Command;

    use super::*;

    struct SleepLauncher;

    impl Launcher for SleepLauncher {
        fn command(&self, _artifact: &Path) -> Command {
            let mut command = Command::new("sleep");
            command.arg("30");
            command
        }
    }

    struct ExitLauncher(i32);

    impl Launcher for ExitLauncher {
        fn command(&self, _artifact: &Path) -> Command {
            let mut command = Command::new("sh");
            command.arg("-c").arg(format!("exit {}", self.0));
            command
        }
    }

    fn fixture(launcher: Arc<dyn Launcher>) -> (TempDir, ProcessSupervisor) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(layout::artifact_path(dir.path(), "1.2"), "jar").unwrap();
        let supervisor =
            ProcessSupervisor::new(launcher, dir.path(), dir.path(), Duration::from_secs(5));
        (dir, supervisor)
    }

    #[tokio::test]
    async fn start_records_pid_and_stop_clears_it() {
        let (_dir, supervisor) = fixture(Arc::new(SleepLauncher));

        let pid = supervisor.start("1.2").unwrap();
        assert_eq!(supervisor.pid_file().load().unwrap(), Some(pid));
        assert_eq!(supervisor.state(), ProcessState::Running { pid });
        assert!(signal::is_alive(pid));

        supervisor.stop().await.unwrap();
        assert!(!signal::is_alive(pid));
        assert_eq!(supervisor.pid_file().load().unwrap(), None);
        assert_eq!(supervisor.state(), ProcessState::Absent);
    }

    #[tokio::test]
    async fn missing_artifact_is_a_launch_error() {
        let (_dir, supervisor) = fixture(Arc::new(SleepLauncher));

        let err = supervisor.start("9.9").unwrap_err();
        assert!(matches!(err, LaunchError::MissingArtifact(_)));
        assert_eq!(supervisor.pid_file().load().unwrap(), None);
        assert_eq!(supervisor.state(), ProcessState::Absent);
    }

    #[tokio::test]
    async fn stop_without_marker_is_a_no_op() {
        let (dir, supervisor) = fixture(Arc::new(SleepLauncher));

        supervisor.stop().await.unwrap();
        assert!(!dir.path().join(layout::PID_FILE).exists());
        assert_eq!(supervisor.state(), ProcessState::Absent);
    }

    #[tokio::test]
    async fn ensure_running_is_idle_without_a_version() {
        let (dir, supervisor) = fixture(Arc::new(SleepLauncher));
        let versions = VersionStore::new(dir.path());

        assert_eq!(supervisor.ensure_running(&versions).unwrap(), Startup::Idle);
        assert_eq!(supervisor.pid_file().load().unwrap(), None);
    }

    #[tokio::test]
    async fn ensure_running_starts_the_recorded_version() {
        let (dir, supervisor) = fixture(Arc::new(SleepLauncher));
        let versions = VersionStore::new(dir.path());
        versions.write("1.2").unwrap();

        let Startup::Started(pid) = supervisor.ensure_running(&versions).unwrap() else {
            panic!("expected the server to be started");
        };
        assert!(signal::is_alive(pid));

        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn restarted_supervisor_reattaches_instead_of_spawning() {
        let (dir, first) = fixture(Arc::new(SleepLauncher));
        let versions = VersionStore::new(dir.path());
        versions.write("1.2").unwrap();
        let pid = first.start("1.2").unwrap();

        let second = ProcessSupervisor::new(
            Arc::new(SleepLauncher),
            dir.path(),
            dir.path(),
            Duration::from_secs(5),
        );
        assert_eq!(
            second.ensure_running(&versions).unwrap(),
            Startup::Reattached(pid)
        );
        assert_eq!(second.pid_file().load().unwrap(), Some(pid));

        // The new supervisor can still stop the child it inherited.
        second.stop().await.unwrap();
        assert!(!signal::is_alive(pid));
        assert_eq!(second.pid_file().load().unwrap(), None);
    }

    #[tokio::test]
    async fn watcher_records_unexpected_exit() {
        let (_dir, supervisor) = fixture(Arc::new(ExitLauncher(3)));
        let mut states = supervisor.subscribe();

        let pid = supervisor.start("1.2").unwrap();
        let exited = tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|s| matches!(s, ProcessState::Exited { .. })),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();

        assert_eq!(
            exited,
            ProcessState::Exited {
                pid,
                outcome: ExitOutcome::Code(3)
            }
        );

        // Stopping a process we already saw exit only clears the marker.
        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.pid_file().load().unwrap(), None);
    }

    #[tokio::test]
    async fn stale_marker_is_reported() {
        let (_dir, supervisor) = fixture(Arc::new(SleepLauncher));
        let stale = i32::MAX as u32;
        supervisor.pid_file().save(stale).unwrap();

        let err = supervisor.stop().await.unwrap_err();
        assert!(matches!(err, StopError::NotFound(pid) if pid == stale));
        assert_eq!(supervisor.pid_file().load().unwrap(), Some(stale));
    }
}
