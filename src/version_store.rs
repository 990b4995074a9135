//! The `VERSION` marker recording which release is installed.

use crate::error::{InstallError, Result};
use crate::types::ReleaseVersion;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const VERSION_FILE_NAME: &str = "VERSION";

pub fn marker_path(install_dir: &Path) -> PathBuf {
    install_dir.join(VERSION_FILE_NAME)
}

/// Reads the recorded version.
///
/// Any failure to read counts as "nothing installed", so a damaged marker
/// leads to a reinstall instead of an error.
pub fn read(install_dir: &Path) -> Option<ReleaseVersion> {
    let path = marker_path(install_dir);
    match fs::read_to_string(&path) {
        Ok(contents) => Some(ReleaseVersion::new(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No version marker at {}", path.display());
            None
        }
        Err(e) => {
            tracing::warn!(
                "Ignoring unreadable version marker {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Replaces the marker with exactly `version`.
///
/// The contents go to a temporary file first and are renamed over the marker,
/// so readers never observe a half-written version.
pub fn write(install_dir: &Path, version: &ReleaseVersion) -> Result<()> {
    let path = marker_path(install_dir);
    let mut staged =
        tempfile::NamedTempFile::new_in(install_dir).map_err(|e| InstallError::fs(install_dir, e))?;
    if let Err(e) = staged.write_all(version.as_str().as_bytes()) {
        return Err(InstallError::fs(staged.path(), e));
    }
    staged
        .persist(&path)
        .map_err(|e| InstallError::fs(&path, e.error))?;

    tracing::debug!("Recorded version {} in {}", version, path.display());
    Ok(())
}

/// When the marker was last written, if it exists.
pub fn installed_at(install_dir: &Path) -> Option<DateTime<Utc>> {
    let modified = fs::metadata(marker_path(install_dir))
        .and_then(|m| m.modified())
        .ok()?;
    Some(DateTime::<Utc>::from(modified))
}
