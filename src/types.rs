use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Release tag installed when no version is configured.
pub const DEFAULT_SERVER_VERSION: &str = "1.3.13";

pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://github.com/fwcd/kotlin-language-server/releases/download/{version}/server.zip";

/// Opaque release identifier. Only compared for exact equality.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReleaseVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Where the coordinator sits in its install lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    Unchecked,
    UpToDate,
    NeedsInstall,
    Installing,
    Installed,
    Failed,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallState::Unchecked => "unchecked",
            InstallState::UpToDate => "up to date",
            InstallState::NeedsInstall => "needs install",
            InstallState::Installing => "installing",
            InstallState::Installed => "installed",
            InstallState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// An external program that must be resolvable before installing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeRequirement {
    pub program: String,
}

impl RuntimeRequirement {
    pub fn java() -> Self {
        Self {
            program: "java".to_string(),
        }
    }
}

/// Fully resolved settings handed to the installer by the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallerSettings {
    pub version: ReleaseVersion,
    pub storage_path: PathBuf,
    pub download_url: String,
    #[serde(default)]
    pub command: Option<Vec<String>>,
    #[serde(default)]
    pub requirement: Option<RuntimeRequirement>,
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,
    pub platform: Platform,
}

impl InstallerSettings {
    /// Defaults rooted at `storage_path`, for hosts that only know where to store things.
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            version: ReleaseVersion::new(DEFAULT_SERVER_VERSION),
            storage_path: storage_path.into(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            command: None,
            requirement: Some(RuntimeRequirement::java()),
            download_timeout_secs: None,
            platform: Platform::detect(),
        }
    }
}
