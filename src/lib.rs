//! Keeps a local copy of the Kotlin language server installed and current.
//!
//! The host hands over its settings, asks [`Installer::needs_update_or_install`],
//! runs [`Installer::install_or_update`] when needed and launches
//! [`Installer::server_command`].

pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod platform;
pub mod types;
pub mod version_store;

pub use config::{resolve_settings, JsonSettings, SettingsProvider};
pub use error::InstallError;
pub use install::Installer;
pub use platform::Platform;
pub use types::{InstallState, InstallerSettings, ReleaseVersion, RuntimeRequirement};
