use std::process::ExitStatus;

/// In-memory view of the supervised process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessState {
    #[default]
    Absent,
    Starting,
    Running {
        pid: u32,
    },
    Stopping {
        pid: u32,
    },
    /// The watcher saw the process go away.
    Exited {
        pid: u32,
        outcome: ExitOutcome,
    },
}

impl ProcessState {
    pub fn pid(&self) -> Option<u32> {
        match self {
            Self::Running { pid } | Self::Stopping { pid } | Self::Exited { pid, .. } => {
                Some(*pid)
            }
            Self::Absent | Self::Starting => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Code(i32),
    Signal(i32),
    WaitFailed(String),
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        match (status.code(), status.signal()) {
            (Some(code), _) => ExitOutcome::Code(code),
            (None, Some(signal)) => ExitOutcome::Signal(signal),
            (None, None) => ExitOutcome::WaitFailed(status.to_string()),
        }
    }
}

impl std::fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitOutcome::Code(code) => write!(f, "exit code {}", code),
            ExitOutcome::Signal(signal) => write!(f, "killed by signal {}", signal),
            ExitOutcome::WaitFailed(reason) => write!(f, "wait failed: {}", reason),
        }
    }
}
