//! Durable on-disk records for the updater.
//!
//! Two independent markers live in the state directory: the installed version
//! (`current_version`) and the running server's process id (`.pid`). Keeping them apart
//! lets a restarted supervisor reattach to a live child without re-deciding versions.

mod error;
pub mod layout;
mod pid;
mod version;

pub use error::{PersistError, PersistResult};
pub use pid::PidFile;
pub use version::VersionStore;
