use std::path::PathBuf;

pub type PersistResult<T> = std::result::Result<T, PersistError>;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable record in {path}: {content:?}")]
    Corrupt { path: PathBuf, content: String },
}

impl PersistError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
