//! Process supervision for the server.
//!
//! [`ProcessSupervisor`] starts the server for a given version, persists its pid so a
//! restarted supervisor can find it again, watches it for exit and stops it on demand.

#[cfg(not(unix))]
compile_error!("keeper-supervisor relies on unix process groups and signals");

mod error;
mod launcher;
mod signal;
mod state;
mod supervisor;

pub use error::{LaunchError, StopError};
pub use launcher::{JavaLauncher, Launcher};
pub use state::{ExitOutcome, ProcessState};
pub use supervisor::{ProcessSupervisor, Startup};
