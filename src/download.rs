use crate::error::{InstallError, Result};
use crate::types::ReleaseVersion;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the downloaded release archive inside the install directory.
pub const ARCHIVE_FILE_NAME: &str = "server.zip";

const USER_AGENT: &str = concat!("lsp-kotlin/", env!("CARGO_PKG_VERSION"));

/// Downloads release archives from a URL template containing `{version}`.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    client: reqwest::Client,
    url_template: String,
}

impl ArchiveFetcher {
    pub fn new(url_template: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: build_client(USER_AGENT, timeout)?,
            url_template: url_template.into(),
        })
    }

    pub fn download_url(&self, version: &ReleaseVersion) -> String {
        self.url_template.replace("{version}", version.as_str())
    }

    /// Streams the archive for `version` to `server.zip` in `destination_dir`.
    ///
    /// Returns `Ok(None)` without touching the network when no version is given.
    /// A failed transfer leaves whatever was written so far in place.
    pub async fn fetch(
        &self,
        version: Option<&ReleaseVersion>,
        destination_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        let Some(version) = version else {
            tracing::debug!("No server version configured, skipping download");
            return Ok(None);
        };

        let url = self.download_url(version);
        let archive_path = destination_dir.join(ARCHIVE_FILE_NAME);
        tracing::info!("Downloading {} from {}", ARCHIVE_FILE_NAME, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| InstallError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::HttpStatus { url, status });
        }

        let total_size = response.content_length().unwrap_or(0);
        let pb = ProgressBar::new(total_size);
        let style = ProgressStyle::default_bar()
            .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message(format!("Downloading kotlin-language-server {}", version));

        let mut file =
            fs::File::create(&archive_path).map_err(|e| InstallError::fs(&archive_path, e))?;
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| InstallError::Transport {
                url: url.clone(),
                source,
            })?;
            file.write_all(&chunk).map_err(|e| InstallError::fs(&archive_path, e))?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.flush().map_err(|e| InstallError::fs(&archive_path, e))?;

        pb.finish_with_message("Download complete");
        tracing::debug!("Wrote {} bytes to {}", downloaded, archive_path.display());
        Ok(Some(archive_path))
    }
}

fn build_client(user_agent: &str, timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(user_agent);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|source| InstallError::HttpClient { source })
}

/// Unpacks every entry of a zip archive under `destination_dir`, keeping relative paths.
pub fn extract_archive(archive_path: &Path, destination_dir: &Path) -> Result<()> {
    tracing::info!(
        "Extracting {} into {}",
        archive_path.display(),
        destination_dir.display()
    );

    let corrupt = |source: zip::result::ZipError| InstallError::ArchiveCorrupt {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = fs::File::open(archive_path).map_err(|e| InstallError::fs(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(corrupt)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(corrupt)?;

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!("Skipping unsafe path in archive: {}", entry.name());
            continue;
        };
        let outpath = destination_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| InstallError::fs(&outpath, e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent).map_err(|e| InstallError::fs(parent, e))?;
        }
        // A previous payload may have left a read-only file here.
        if outpath.is_file() {
            fs::remove_file(&outpath).map_err(|e| InstallError::fs(&outpath, e))?;
        }

        let mut outfile =
            fs::File::create(&outpath).map_err(|e| InstallError::fs(&outpath, e))?;
        io::copy(&mut entry, &mut outfile).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                corrupt(zip::result::ZipError::Io(e))
            }
            _ => InstallError::fs(&outpath, e),
        })?;

        // Only rwx bits; setuid, setgid and sticky are never restored.
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&outpath, fs::Permissions::from_mode(mode & 0o777))
                .map_err(|e| InstallError::fs(&outpath, e))?;
        }

        tracing::trace!("Extracted {}", relative.display());
    }

    Ok(())
}

/// Adds the owner-execute bit to `path`, leaving every other bit alone.
///
/// Hosts without a notion of execute permission only check that the file exists.
pub fn make_executable(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| InstallError::fs(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = metadata.permissions();
        let mode = perms.mode();
        if mode & 0o100 == 0 {
            perms.set_mode(mode | 0o100);
            fs::set_permissions(path, perms).map_err(|e| InstallError::fs(path, e))?;
            tracing::debug!("Marked {} as executable", path.display());
        }
    }

    #[cfg(not(unix))]
    let _ = metadata;

    Ok(())
}
