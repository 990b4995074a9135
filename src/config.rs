use crate::error::{InstallError, Result};
use crate::platform::Platform;
use crate::types::*;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory name the installer owns under the storage root.
pub const PACKAGE_NAME: &str = "LSP-kotlin";
pub const SESSION_NAME: &str = "kotlin";
pub const SETTINGS_FILE_NAME: &str = "LSP-kotlin.json";
/// Token in `command` replaced with the storage root.
pub const STORAGE_PATH_PLACEHOLDER: &str = "${storage_path}";

const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LSP_KOTLIN_VERSION", "version"),
    ("LSP_KOTLIN_STORAGE_PATH", "storage_path"),
    ("LSP_KOTLIN_DOWNLOAD_URL", "download_url"),
    ("LSP_KOTLIN_REQUIRE_JAVA", "require_java"),
    ("LSP_KOTLIN_PLATFORM", "platform"),
];

/// Key/value lookup the host exposes to the installer.
pub trait SettingsProvider {
    fn get(&self, key: &str) -> Option<&Value>;

    /// Typed lookup; unset and `null` both yield `default`.
    fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T>
    where
        Self: Sized,
    {
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| InstallError::InvalidSetting {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Settings held as a flat JSON object, as stored in `LSP-kotlin.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonSettings {
    values: Map<String, Value>,
}

impl JsonSettings {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                values: map
                    .into_iter()
                    .map(|(k, v)| (normalize_key(&k), v))
                    .collect(),
            }),
            Value::Null => Ok(Self::default()),
            other => Err(InstallError::InvalidSetting {
                key: "<root>".to_string(),
                reason: format!("expected a JSON object, found {}", other),
            }),
        }
    }

    /// Loads settings from `path`; a missing file means no settings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings file at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| InstallError::fs(path, e))?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| InstallError::SettingsFile {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_value(value)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(normalize_key(key), value.into());
    }

    /// Applies `LSP_KOTLIN_*` environment variables over file values.
    pub fn apply_env_overrides(&mut self) {
        for (var, key) in ENV_OVERRIDES {
            if let Ok(raw) = std::env::var(var) {
                tracing::debug!("Setting '{}' overridden by {}", key, var);
                let value = if *key == "require_java" {
                    Value::Bool(raw.to_lowercase() == "true" || raw == "1")
                } else {
                    Value::String(raw)
                };
                self.values.insert((*key).to_string(), value);
            }
        }
    }
}

impl SettingsProvider for JsonSettings {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

pub fn default_settings_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_FILE_NAME))
}

pub fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Builds the installer's settings from whatever the host provides.
pub fn resolve_settings<P: SettingsProvider>(provider: &P) -> Result<InstallerSettings> {
    let version: String = provider.get_or("version", DEFAULT_SERVER_VERSION.to_string())?;
    if version.trim().is_empty() {
        return Err(InstallError::InvalidSetting {
            key: "version".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    let storage_path: Option<PathBuf> = provider.get_or("storage_path", None)?;
    let download_url: String = provider.get_or("download_url", DEFAULT_DOWNLOAD_URL.to_string())?;
    if !download_url.contains("{version}") {
        tracing::warn!(
            "download_url '{}' has no {{version}} placeholder; every release resolves to the same URL",
            download_url
        );
    }

    let command: Option<Vec<String>> = provider.get_or("command", None)?;
    if command.as_ref().is_some_and(|c| c.is_empty()) {
        return Err(InstallError::InvalidSetting {
            key: "command".to_string(),
            reason: "must contain at least the executable".to_string(),
        });
    }

    let require_java: bool = provider.get_or("require_java", true)?;
    let java_program: String = provider.get_or("java_program", "java".to_string())?;
    let requirement = require_java.then_some(RuntimeRequirement {
        program: java_program,
    });

    let download_timeout_secs = provider
        .get_or::<Option<u64>>("download_timeout_secs", None)?
        .filter(|secs| *secs > 0);

    let platform = match provider.get_or::<Option<String>>("platform", None)? {
        Some(name) => name.parse::<Platform>()?,
        None => Platform::detect(),
    };

    Ok(InstallerSettings {
        version: ReleaseVersion::new(version),
        storage_path: storage_path.unwrap_or_else(default_storage_path),
        download_url,
        command,
        requirement,
        download_timeout_secs,
        platform,
    })
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}
