use std::{fs::OpenOptions, sync::Arc};

use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{Config, LoggingError};

/// Log to stdout and append to the configured log file.
///
/// Failing to open the log file is fatal.
pub fn init(config: &Config) -> Result<(), LoggingError> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .map_err(|source| LoggingError::OpenLog {
            path: config.log_file.clone(),
            source,
        })?;

    let app_level = if config.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let global_filter = Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target("keeper", app_level)
        .with_target("hyper", LevelFilter::OFF)
        .with_target("reqwest", LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .with(global_filter)
        .try_init()?;

    Ok(())
}
