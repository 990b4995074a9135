//! Install coordinator
//!
//! Decides whether the language server has to be (re)installed and runs the
//! download, extract, permission repair and version marker steps in order.
//! One coordinator is expected per install directory; concurrent installs
//! against the same directory must be serialized by the caller.

use crate::config::{PACKAGE_NAME, STORAGE_PATH_PLACEHOLDER};
use crate::download::{extract_archive, make_executable, ArchiveFetcher};
use crate::error::{InstallError, Result};
use crate::platform::is_binary_available;
use crate::types::*;
use crate::version_store;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Directory inside the release archive holding the launcher scripts.
pub const BINARY_SUBDIR: &str = "bin";

#[derive(Debug)]
pub struct Installer {
    settings: InstallerSettings,
    fetcher: ArchiveFetcher,
    state: InstallState,
}

impl Installer {
    pub fn new(settings: InstallerSettings) -> Result<Self> {
        let fetcher = ArchiveFetcher::new(
            settings.download_url.clone(),
            settings.download_timeout_secs.map(Duration::from_secs),
        )?;
        Ok(Self {
            settings,
            fetcher,
            state: InstallState::Unchecked,
        })
    }

    pub fn settings(&self) -> &InstallerSettings {
        &self.settings
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    pub fn desired_version(&self) -> &ReleaseVersion {
        &self.settings.version
    }

    pub fn install_dir(&self) -> PathBuf {
        self.settings.storage_path.join(PACKAGE_NAME)
    }

    pub fn installed_version(&self) -> Option<ReleaseVersion> {
        version_store::read(&self.install_dir())
    }

    pub fn installed_at(&self) -> Option<DateTime<Utc>> {
        version_store::installed_at(&self.install_dir())
    }

    fn substitute_storage_path(&self, value: &str) -> String {
        value.replace(
            STORAGE_PATH_PLACEHOLDER,
            &self.settings.storage_path.to_string_lossy(),
        )
    }

    /// Path of the server launcher.
    ///
    /// A configured `command` wins over the install directory layout; either
    /// way the platform's launcher extension is enforced.
    pub fn binary_path(&self) -> PathBuf {
        let platform = self.settings.platform;
        match self.settings.command.as_ref().and_then(|c| c.first()) {
            Some(executable) => {
                let executable = self.substitute_storage_path(executable);
                PathBuf::from(platform.normalize_executable(&executable))
            }
            None => self
                .install_dir()
                .join(BINARY_SUBDIR)
                .join(platform.binary_file_name()),
        }
    }

    /// Full command line used to launch the server.
    pub fn server_command(&self) -> Vec<String> {
        let binary = self.binary_path().to_string_lossy().to_string();
        match &self.settings.command {
            Some(command) => std::iter::once(binary)
                .chain(
                    command
                        .iter()
                        .skip(1)
                        .map(|arg| self.substitute_storage_path(arg)),
                )
                .collect(),
            None => vec![binary],
        }
    }

    pub fn is_server_installed(&self) -> bool {
        is_binary_available(self.binary_path())
    }

    /// True when the launcher is missing or the recorded version differs from the desired one.
    pub fn needs_update_or_install(&mut self) -> bool {
        let installed = self.is_server_installed();
        let recorded = self.installed_version();
        let needed = !installed || recorded.as_ref() != Some(&self.settings.version);

        tracing::debug!(
            "Server binary present: {}, recorded version: {:?}, desired version: {}",
            installed,
            recorded.as_ref().map(ReleaseVersion::as_str),
            self.settings.version
        );

        self.state = if needed {
            InstallState::NeedsInstall
        } else {
            InstallState::UpToDate
        };
        tracing::info!("kotlin-language-server status: {}", self.state);
        needed
    }

    /// Fails when the configured runtime (normally `java`) cannot be found.
    pub fn check_precondition(&self) -> Result<()> {
        match &self.settings.requirement {
            Some(requirement) if !is_binary_available(&requirement.program) => {
                Err(InstallError::PreconditionMissing {
                    program: requirement.program.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Downloads and unpacks the desired release, returning the launcher path.
    ///
    /// Errors are returned unchanged and nothing is retried or rolled back; a
    /// failed run may leave a partial payload that the next run overwrites.
    pub async fn install_or_update(&mut self) -> Result<PathBuf> {
        self.state = InstallState::Installing;
        match self.run_install().await {
            Ok(path) => {
                self.state = InstallState::Installed;
                Ok(path)
            }
            Err(e) => {
                tracing::error!("Installing kotlin-language-server failed: {}", e);
                self.state = InstallState::Failed;
                Err(e)
            }
        }
    }

    async fn run_install(&self) -> Result<PathBuf> {
        self.check_precondition()?;

        let version = &self.settings.version;
        let install_dir = self.install_dir();
        tracing::info!(
            "Installing kotlin-language-server {} into {}",
            version,
            install_dir.display()
        );

        fs::create_dir_all(&install_dir).map_err(|e| InstallError::fs(&install_dir, e))?;

        let archive_path = self
            .fetcher
            .fetch(Some(version), &install_dir)
            .await?
            .ok_or_else(|| InstallError::InvalidSetting {
                key: "version".to_string(),
                reason: "no server version to download".to_string(),
            })?;

        extract_archive(&archive_path, &install_dir)?;

        let binary_path = self.binary_path();
        make_executable(&binary_path)?;

        // Last, so a recorded version always means a runnable install.
        version_store::write(&install_dir, version)?;

        tracing::info!(
            "Installed kotlin-language-server {} at {}",
            version,
            binary_path.display()
        );
        Ok(binary_path)
    }
}
