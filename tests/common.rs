use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;
use zip::write::FileOptions;

#[allow(dead_code)]
pub const LAUNCHER_SCRIPT: &[u8] =
    b"#!/bin/sh\nexec java -jar \"$(dirname \"$0\")/../lib/server.jar\" \"$@\"\n";

/// Builds a zip shaped like a kotlin-language-server release.
///
/// The launcher is stored without execute permission so installs have to repair it.
#[allow(dead_code)]
pub fn release_archive() -> Vec<u8> {
    build_zip(&[
        ("bin/", None),
        ("bin/kotlin-language-server", Some(LAUNCHER_SCRIPT)),
        (
            "bin/kotlin-language-server.bat",
            Some(&b"@echo off\r\njava -jar ..\\lib\\server.jar\r\n"[..]),
        ),
        ("lib/server.jar", Some(&b"PK fake jar contents"[..])),
    ])
}

#[allow(dead_code)]
pub fn build_zip(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        match contents {
            None => writer
                .add_directory(*name, FileOptions::default())
                .expect("add directory"),
            Some(bytes) => {
                writer
                    .start_file(*name, FileOptions::default().unix_permissions(0o644))
                    .expect("start file");
                writer.write_all(bytes).expect("write entry");
            }
        }
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Minimal HTTP server answering canned responses per request path.
///
/// Runs on a detached thread for the rest of the test process.
#[allow(dead_code)]
pub struct ReleaseServer {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl ReleaseServer {
    pub fn spawn(routes: HashMap<String, (u16, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind release server");
        let port = listener.local_addr().expect("local addr").port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                if let Some(path) = Self::respond(stream, &routes) {
                    if let Ok(mut guard) = recorded.lock() {
                        guard.push(path);
                    }
                }
            }
        });

        Self { port, requests }
    }

    /// Serves `archive` for `version` and 404s everything else.
    pub fn with_release(version: &str, archive: Vec<u8>) -> Self {
        let mut routes = HashMap::new();
        routes.insert(format!("/releases/{}/server.zip", version), (200, archive));
        Self::spawn(routes)
    }

    fn respond(stream: TcpStream, routes: &HashMap<String, (u16, Vec<u8>)>) -> Option<String> {
        let mut reader = BufReader::new(stream.try_clone().ok()?);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).ok()?;
        let path = request_line.split_whitespace().nth(1)?.to_string();

        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).ok()? == 0 || header == "\r\n" {
                break;
            }
        }

        let (status, body) = routes
            .get(&path)
            .cloned()
            .unwrap_or((404, b"Not Found".to_vec()));
        let reason = if status == 200 { "OK" } else { "Error" };
        let mut stream = stream;
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            reason,
            body.len()
        );
        stream.write_all(head.as_bytes()).ok()?;
        stream.write_all(&body).ok()?;
        stream.flush().ok()?;
        Some(path)
    }

    pub fn url_template(&self) -> String {
        format!("http://127.0.0.1:{}/releases/{{version}}/server.zip", self.port)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

/// Relative path, contents and permission bits of every file under `root`.
#[allow(dead_code)]
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>, u32)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            let contents = fs::read(e.path()).unwrap();
            (relative, contents, mode_of(e.path()))
        })
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

#[cfg(unix)]
#[allow(dead_code)]
pub fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o7777
}

#[cfg(not(unix))]
#[allow(dead_code)]
pub fn mode_of(_path: &Path) -> u32 {
    0
}

// Helpers for driving the built binary with isolated settings and storage.
#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub settings_path: PathBuf,
    pub storage_path: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let settings_path = temp_dir.path().join("LSP-kotlin.json");
        let storage_path = temp_dir.path().join("storage");
        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_lsp-kotlin"));

        Self {
            _temp_dir: temp_dir,
            settings_path,
            storage_path,
            bin_path,
        }
    }

    pub fn write_settings(&self, json: &str) {
        fs::write(&self.settings_path, json).expect("Failed to write settings");
    }

    pub fn install_dir(&self) -> PathBuf {
        self.storage_path.join("LSP-kotlin")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.arg("--settings").arg(&self.settings_path);
        cmd.arg("--storage-path").arg(&self.storage_path);
        cmd.env("HOME", self._temp_dir.path());
        cmd.env("XDG_DATA_HOME", self._temp_dir.path().join("data"));
        cmd.env("XDG_CONFIG_HOME", self._temp_dir.path().join("config"));
        for var in [
            "LSP_KOTLIN_VERSION",
            "LSP_KOTLIN_STORAGE_PATH",
            "LSP_KOTLIN_DOWNLOAD_URL",
            "LSP_KOTLIN_PLATFORM",
            "RUST_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd.env("LSP_KOTLIN_REQUIRE_JAVA", "false");
        cmd
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        if self.status.success() {
            panic!(
                "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            );
        }
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
