//! Error types for manifest and artifact fetches

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("malformed manifest: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download of {url} ended after {actual} of {expected} bytes")]
    Truncated {
        url: String,
        expected: u64,
        actual: u64,
    },
}

impl FetchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Transport failures, server-side errors and short bodies are worth another try;
    /// a manifest we cannot decode or a local disk error is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Truncated { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode(_) | Self::Io { .. } => false,
        }
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        let server_error = FetchError::Status {
            url: "u".into(),
            status: 503,
        };
        let throttled = FetchError::Status {
            url: "u".into(),
            status: 429,
        };
        let missing = FetchError::Status {
            url: "u".into(),
            status: 404,
        };
        let truncated = FetchError::Truncated {
            url: "u".into(),
            expected: 10,
            actual: 3,
        };
        let decode: FetchError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        let io = FetchError::io("/x", std::io::Error::other("disk full"));

        assert!(server_error.is_retryable());
        assert!(throttled.is_retryable());
        assert!(truncated.is_retryable());
        assert!(!missing.is_retryable());
        assert!(!decode.is_retryable());
        assert!(!io.is_retryable());
    }

    #[test]
    fn status_message_names_the_url() {
        let err = FetchError::Status {
            url: "https://example.com/versions.json".into(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "https://example.com/versions.json answered with status 404"
        );
    }
}
