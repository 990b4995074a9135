//! Failures surfaced by the install sequence.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("required runtime '{program}' was not found on PATH")]
    PreconditionMissing { program: String },

    #[error("could not initialise HTTP client: {source}")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to download {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download of {url} failed with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not extract archive {path}: {source}")]
    ArchiveCorrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("filesystem operation on {path} failed: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse settings file {path}: {source}")]
    SettingsFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },
}

impl InstallError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        InstallError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// True when the download could not complete, whatever the cause.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            InstallError::Transport { .. } | InstallError::HttpStatus { .. }
        )
    }
}

pub type Result<T, E = InstallError> = std::result::Result<T, E>;
