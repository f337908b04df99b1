//! Signal delivery to the server's process group.

use std::time::Duration;

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tokio::time::{Instant, sleep};

use crate::StopError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) fn terminate_group(pid: u32) -> Result<(), StopError> {
    signal_group(pid, Signal::SIGTERM)
}

pub(crate) fn kill_group(pid: u32) -> Result<(), StopError> {
    signal_group(pid, Signal::SIGKILL)
}

/// Probe with signal 0. Anything but `ESRCH` (e.g. `EPERM`) means the pid exists.
pub(crate) fn is_alive(pid: u32) -> bool {
    match to_pid(pid) {
        Ok(pid) => !matches!(signal::kill(pid, None), Err(Errno::ESRCH)),
        Err(_) => false,
    }
}

/// Poll until `pid` is gone or `timeout` elapses. Returns whether it is gone.
///
/// A timeout too large to represent as an instant waits indefinitely.
pub(crate) async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if !is_alive(pid) {
            return true;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

fn signal_group(pid: u32, sig: Signal) -> Result<(), StopError> {
    match signal::killpg(to_pid(pid)?, sig) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Err(StopError::NotFound(pid)),
        Err(source) => Err(StopError::Signal { pid, source }),
    }
}

// 0 and negative values address whole groups (including our own), and 1 is init.
fn to_pid(pid: u32) -> Result<Pid, StopError> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 1 => Ok(Pid::from_raw(raw)),
        _ => Err(StopError::NotFound(pid)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_special_pids() {
        assert!(matches!(terminate_group(0), Err(StopError::NotFound(0))));
        assert!(matches!(terminate_group(1), Err(StopError::NotFound(1))));
        assert!(matches!(
            terminate_group(u32::MAX),
            Err(StopError::NotFound(_))
        ));
        assert!(!is_alive(0));
    }

    #[test]
    fn own_process_is_alive() {
        assert!(is_alive(std::process::id()));
    }

    #[tokio::test]
    async fn unbounded_wait_returns_once_the_pid_is_gone() {
        assert!(wait_for_exit(i32::MAX as u32, Duration::MAX).await);
    }

    #[tokio::test]
    async fn wait_times_out_on_a_live_pid() {
        assert!(!wait_for_exit(std::process::id(), Duration::from_millis(50)).await);
    }

    #[test]
    fn unused_pid_is_not_found() {
        // Above any kernel pid_max.
        let pid = i32::MAX as u32;
        assert!(!is_alive(pid));
        assert!(matches!(kill_group(pid), Err(StopError::NotFound(p)) if p == pid));
    }
}
