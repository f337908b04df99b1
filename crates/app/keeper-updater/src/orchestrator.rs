use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use keeper_backup::{BackupError, BackupJob, TarGzWriter};
use keeper_manifest::{Channel, FetchError, HttpFeed, ReleaseFeed};
use keeper_state::{VersionStore, layout};
use keeper_supervisor::{JavaLauncher, ProcessSupervisor};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::{Config, UpdateError};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(4 * 60 * 60);

/// Result of one pass of the update loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The installed version is already the newest on the channel.
    UpToDate { version: String },
    /// The manifest has nothing on the configured channel.
    NoCandidate,
    Updated { from: Option<String>, to: String },
}

/// The periodic decide-and-apply loop.
///
/// Owns the installed-version record and the process supervisor. Cycles take
/// `&mut self`, so a new cycle can never start while a previous download, backup or
/// swap is still in flight.
#[derive(bon::Builder)]
pub struct UpdateOrchestrator {
    feed: Arc<dyn ReleaseFeed>,
    backup: BackupJob,
    versions: VersionStore,
    supervisor: ProcessSupervisor,
    #[builder(default)]
    channel: Channel,
    #[builder(into)]
    server_dir: PathBuf,
    #[builder(default = DEFAULT_INTERVAL)]
    interval: Duration,
    shutdown: watch::Receiver<()>,
}

impl UpdateOrchestrator {
    pub fn from_config(
        config: &Config,
        shutdown: watch::Receiver<()>,
    ) -> Result<Self, UpdateError> {
        let feed = HttpFeed::new(
            &config.download_url,
            config.http_timeout(),
            config.fetch_retries,
        )?;
        let launcher = JavaLauncher::new(&config.java, config.ram_alloc);
        let supervisor = ProcessSupervisor::new(
            Arc::new(launcher),
            &config.server_path,
            &config.state_dir,
            config.stop_timeout(),
        );
        let backup = BackupJob::new(
            Arc::new(TarGzWriter::default()),
            &config.world_dir,
            &config.backup_dir,
        );

        Ok(Self::builder()
            .feed(Arc::new(feed))
            .backup(backup)
            .versions(VersionStore::new(&config.state_dir))
            .supervisor(supervisor)
            .channel(config.channel())
            .server_dir(&config.server_path)
            .interval(config.interval())
            .shutdown(shutdown)
            .build())
    }

    /// Reattach to or start the server, then poll until shutdown.
    ///
    /// Cycle errors are logged and retried on the next interval; they never end the loop.
    pub async fn run(mut self) {
        self.sweep_stale_temp_files();

        match self.supervisor.ensure_running(&self.versions) {
            Ok(startup) => info!(?startup, "Supervisor ready"),
            Err(err) => error!(error = %err, "Could not start the installed server"),
        }

        loop {
            match self.poll_cycle().await {
                Ok(outcome) => debug!(?outcome, "Update cycle finished"),
                Err(UpdateError::Aborted) => break,
                Err(err) => error!(error = %err, "Update cycle failed; retrying next interval"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        info!("Update loop stopped");
    }

    /// Remove partial downloads and backups left by a keeper that was killed mid-cycle.
    fn sweep_stale_temp_files(&self) {
        for dir in [self.server_dir.as_path(), self.backup.backup_dir()] {
            match keeper_fs::sweep_temp_files(dir) {
                Ok(0) => {}
                Ok(removed) => info!(dir = %dir.display(), removed, "Removed stale temp files"),
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "Could not sweep temp files");
                }
            }
        }
    }

    /// Check the feed once and update if the channel has moved on.
    #[instrument(skip(self), fields(channel = %self.channel))]
    pub async fn poll_cycle(&mut self) -> Result<CycleOutcome, UpdateError> {
        let manifest = tokio::select! {
            manifest = self.feed.manifest() => manifest?,
            _ = self.shutdown.changed() => return Err(UpdateError::Aborted),
        };

        let Some(newest) = manifest.newest(self.channel) else {
            info!("No version published on this channel");
            return Ok(CycleOutcome::NoCandidate);
        };
        let target = newest.id.clone();

        let installed = self.versions.read()?;
        info!(newest = %target, ?installed, "Checked for update");

        if installed.as_deref() == Some(target.as_str()) {
            return Ok(CycleOutcome::UpToDate { version: target });
        }

        self.apply_update(&target).await?;
        Ok(CycleOutcome::Updated {
            from: installed,
            to: target,
        })
    }

    /// Download and back up concurrently, then swap the server over to `version_id`.
    ///
    /// Both preparatory tasks run to completion before either result is looked at. If
    /// either failed nothing is swapped and the running server is left alone.
    #[instrument(skip(self))]
    pub async fn apply_update(&mut self, version_id: &str) -> Result<(), UpdateError> {
        info!("Updating");

        let download = download_artifact(self.feed.as_ref(), &self.server_dir, version_id);
        let backup = run_backup(self.backup.clone(), version_id.to_string());

        let (downloaded, backed_up) = tokio::select! {
            results = async { tokio::join!(download, backup) } => results,
            _ = self.shutdown.changed() => {
                warn!("Shutdown requested; abandoning update before swap");
                return Err(UpdateError::Aborted);
            }
        };

        if let Err(err) = &downloaded {
            error!(error = %err, "Download failed; update aborted");
        }
        if let Err(err) = &backed_up {
            error!(error = %err, "Backup failed; update aborted");
        }
        downloaded?;
        backed_up?;

        self.swap(version_id).await
    }

    /// stop → record → start, strictly in that order.
    async fn swap(&mut self, version_id: &str) -> Result<(), UpdateError> {
        info!("Swap starting");

        self.supervisor.stop().await.inspect_err(|err| {
            error!(error = %err, "Swap aborted: running server could not be stopped");
        })?;

        self.versions.write(version_id).inspect_err(|err| {
            error!(error = %err, "Swap failed: server stopped but new version not recorded");
        })?;

        let pid = self.supervisor.start(version_id).inspect_err(|err| {
            error!(error = %err, "Swap failed: new version recorded but server not started");
        })?;

        info!(pid, "Swap complete");
        Ok(())
    }
}

/// Fetch the artifact unless it is already on disk.
///
/// Feeds only ever create the artifact file once it is complete, so presence alone
/// means there is nothing to fetch.
async fn download_artifact(
    feed: &dyn ReleaseFeed,
    server_dir: &Path,
    version_id: &str,
) -> Result<(), UpdateError> {
    let dest = layout::artifact_path(server_dir, version_id);
    let present = tokio::fs::try_exists(&dest)
        .await
        .map_err(|e| FetchError::io(&dest, e))?;

    if present {
        info!(artifact = %dest.display(), "Artifact already downloaded");
        return Ok(());
    }

    feed.download(version_id, &dest).await?;
    Ok(())
}

async fn run_backup(job: BackupJob, version_id: String) -> Result<(), UpdateError> {
    tokio::task::spawn_blocking(move || job.run(&version_id))
        .await
        .map_err(|e| BackupError::Task(e.to_string()))??;
    Ok(())
}
