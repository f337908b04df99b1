//! Command line and environment configuration.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use keeper_manifest::Channel;

/// One year.
const MAX_INTERVAL_HOURS: u64 = 24 * 365;
/// One day.
const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

pub const DEFAULT_DOWNLOAD_URL: &str = "https://s3.amazonaws.com/Minecraft.Download/versions";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "keeper",
    version,
    about = "Keeps a server pinned to the newest published version"
)]
pub struct Config {
    /// Hours between update checks
    #[arg(
        long,
        env = "KEEPER_UPDATE_INTERVAL",
        default_value_t = 4,
        value_name = "HOURS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_HOURS)
    )]
    pub update_interval: u64,

    /// Show debug logs
    #[arg(long, env = "KEEPER_DEBUG")]
    pub debug: bool,

    /// Only follow releases; snapshots are followed otherwise
    #[arg(long, env = "KEEPER_RELEASE_ONLY")]
    pub release_only: bool,

    /// Directory holding the server artifacts; the server runs from here
    #[arg(long, env = "KEEPER_SERVER_PATH", default_value = ".")]
    pub server_path: PathBuf,

    /// Heap given to the server, in MiB
    #[arg(
        long,
        env = "KEEPER_RAM_ALLOC",
        default_value_t = 2048,
        value_name = "MB",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub ram_alloc: u32,

    /// World directory to back up before each update
    #[arg(long, env = "KEEPER_WORLD_DIR", default_value = "./world")]
    pub world_dir: PathBuf,

    /// Where backup archives are written
    #[arg(long, env = "KEEPER_BACKUP_DIR", default_value = "./backups")]
    pub backup_dir: PathBuf,

    /// Base URL of the version manifest and artifacts
    #[arg(long, env = "KEEPER_DOWNLOAD_URL", default_value = DEFAULT_DOWNLOAD_URL)]
    pub download_url: String,

    /// Directory holding the installed-version and pid markers
    #[arg(long, env = "KEEPER_STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,

    /// Java executable used to launch the server
    #[arg(long, env = "KEEPER_JAVA", default_value = "java")]
    pub java: PathBuf,

    /// Log file, appended to
    #[arg(long, env = "KEEPER_LOG_FILE", default_value = "keeper.log")]
    pub log_file: PathBuf,

    /// Seconds to wait for the server to exit after SIGTERM before killing it
    #[arg(
        long,
        env = "KEEPER_STOP_TIMEOUT",
        default_value_t = 30,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS)
    )]
    pub stop_timeout: u64,

    /// Upper bound for a single HTTP request, including the body
    #[arg(
        long,
        env = "KEEPER_HTTP_TIMEOUT",
        default_value_t = 300,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS)
    )]
    pub http_timeout: u64,

    /// Retries for a failed manifest fetch or download
    #[arg(long, env = "KEEPER_FETCH_RETRIES", default_value_t = 3)]
    pub fetch_retries: usize,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.update_interval.saturating_mul(60 * 60))
    }

    pub fn channel(&self) -> Channel {
        Channel::from_release_only(self.release_only)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout)
    }
}
