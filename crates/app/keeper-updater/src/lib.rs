//! The update loop.
//!
//! Polls the release feed, and when a newer build is published downloads it, backs up
//! the world, and swaps the running server over to it.

pub mod config;
mod error;
pub mod logging;
mod orchestrator;

pub use config::Config;
pub use error::{LoggingError, UpdateError};
pub use orchestrator::{CycleOutcome, UpdateOrchestrator};
