//! Error type for the Sharepoint upload client.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort an upload.
///
/// Variants that come from an HTTP exchange carry the status code and the
/// response body so the caller can print them as-is.
#[derive(Debug, Error)]
pub enum SharepointError {
    #[error("token request to {url} failed with HTTP {status}: {body}")]
    Authentication { url: String, status: u16, body: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("creating upload session at {url} failed with HTTP {status}: {body}")]
    SessionCreation { url: String, status: u16, body: String },

    #[error("uploading segment {range} failed with HTTP {status}: {body}")]
    SegmentUpload {
        range: String,
        status: u16,
        body: String,
    },

    #[error("upload to {url} failed with HTTP {status}: {body}")]
    UploadFailed { url: String, status: u16, body: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("unexpected response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("{} is {size} bytes, simple upload accepts at most {limit}", .path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SharepointError {
    /// HTTP status of the failed exchange, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. }
            | Self::SessionCreation { status, .. }
            | Self::SegmentUpload { status, .. }
            | Self::UploadFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SharepointError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_exposed_for_http_failures() {
        let err = SharepointError::SegmentUpload {
            range: "bytes 0-9/10".to_string(),
            status: 416,
            body: "range not satisfiable".to_string(),
        };
        assert_eq!(err.status(), Some(416));
        assert!(err.to_string().contains("bytes 0-9/10"));
        assert!(err.to_string().contains("range not satisfiable"));
    }

    #[test]
    fn test_transport_errors_have_no_status() {
        let err = SharepointError::Transport {
            url: "https://example.invalid".to_string(),
            message: "connection reset by peer".to_string(),
        };
        assert_eq!(err.status(), None);
    }
}
