use crate::error::InstallError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const SERVER_BINARY_NAME: &str = "kotlin-language-server";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Osx,
    Windows,
}

impl Platform {
    pub fn detect() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::Osx,
            _ => Platform::Linux,
        }
    }

    /// Extension the launcher script carries on this platform, if any.
    pub fn executable_extension(self) -> Option<&'static str> {
        match self {
            Platform::Windows => Some("bat"),
            Platform::Linux | Platform::Osx => None,
        }
    }

    pub fn binary_file_name(self) -> String {
        match self.executable_extension() {
            Some(ext) => format!("{}.{}", SERVER_BINARY_NAME, ext),
            None => SERVER_BINARY_NAME.to_string(),
        }
    }

    /// Appends the platform extension unless `command` already ends with it.
    pub fn normalize_executable(self, command: &str) -> String {
        match self.executable_extension() {
            Some(ext) if !command.ends_with(&format!(".{}", ext)) => {
                format!("{}.{}", command, ext)
            }
            _ => command.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::Osx => "osx",
            Platform::Windows => "windows",
        };
        f.write_str(name)
    }
}

impl FromStr for Platform {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "osx" | "macos" | "darwin" => Ok(Platform::Osx),
            "windows" | "win" => Ok(Platform::Windows),
            other => Err(InstallError::InvalidSetting {
                key: "platform".to_string(),
                reason: format!("unknown platform '{}'", other),
            }),
        }
    }
}

/// Whether `program` resolves to something runnable, either as a path or via PATH.
pub fn is_binary_available(program: impl AsRef<Path>) -> bool {
    let program = program.as_ref();
    match which::which(program) {
        Ok(resolved) => {
            tracing::trace!("Resolved {} to {}", program.display(), resolved.display());
            true
        }
        Err(_) => false,
    }
}
