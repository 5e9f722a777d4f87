//! MediaTree configuration
//!
//! The YAML file has three sections: `sync` (media formats, pool sizes,
//! privacy of created nodes), `remote` (hierarchy depth) and `logging`.
//! Every field has a default, so a partial or missing file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::node::Privacy;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for MediaTree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Sync pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Lowercased extensions (without dot) of files considered media.
    pub media_extensions: Vec<String>,
    /// Extensions compared by modification timestamp instead of content hash.
    pub video_formats: Vec<String>,
    /// Extensions the service re-encodes and renames on ingestion.
    pub transcoded_formats: Vec<String>,
    /// Concurrent local folder discovery tasks.
    pub folder_workers: usize,
    /// Concurrent file comparison tasks.
    pub file_workers: usize,
    /// Concurrent upload tasks.
    pub upload_workers: usize,
    /// Privacy of folders and albums created by sync.
    pub default_privacy: Privacy,
}

/// Remote service limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Maximum number of folder levels below the root.
    pub max_depth: usize,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Parses the YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], but any read or parse error yields the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Location of the user's configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/mediatree/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("mediatree")
            .join("config.yaml")
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

/// Media extensions synced when the configuration does not list any.
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &["gif", "jpeg", "jpg", "mov", "mp4", "png", "heic"];

/// Extensions whose remote copies are re-encoded, making hashes useless.
pub const DEFAULT_VIDEO_FORMATS: &[&str] = &["mov", "mp4"];

/// Extensions converted to JPEG and renamed by the service.
pub const DEFAULT_TRANSCODED_FORMATS: &[&str] = &["heic"];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            media_extensions: owned(DEFAULT_MEDIA_EXTENSIONS),
            video_formats: owned(DEFAULT_VIDEO_FORMATS),
            transcoded_formats: owned(DEFAULT_TRANSCODED_FORMATS),
            folder_workers: 4,
            file_workers: 16,
            upload_workers: 3,
            default_privacy: Privacy::Public,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { max_depth: 5 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Child lists kept beyond one per folder and file worker during a sync.
pub const CHILDREN_CACHE_SLACK: usize = 5;

impl SyncConfig {
    /// Nodes whose children a sync run keeps cached at most.
    ///
    /// Folder and file workers each hold on to one container at a time.
    pub fn children_cache_limit(&self) -> usize {
        self.folder_workers + self.file_workers + CHILDREN_CACHE_SLACK
    }

    /// Returns true when `extension` (any case, no dot) is a media type.
    pub fn is_media_extension(&self, extension: &str) -> bool {
        contains_ignore_case(&self.media_extensions, extension)
    }

    /// Returns true when `extension` is compared by timestamp.
    pub fn is_video_format(&self, extension: &str) -> bool {
        contains_ignore_case(&self.video_formats, extension)
    }

    /// Returns true when `extension` is re-encoded by the service.
    pub fn is_transcoded_format(&self, extension: &str) -> bool {
        contains_ignore_case(&self.transcoded_formats, extension)
    }
}

fn contains_ignore_case(list: &[String], extension: &str) -> bool {
    let extension = extension.trim();
    list.iter().any(|e| e.eq_ignore_ascii_case(extension))
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.file_workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Checks every section and collects all problems.
    ///
    /// Returns an empty list for a usable configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.media_extensions.is_empty() {
            errors.push(ValidationError {
                field: "sync.media_extensions".into(),
                message: "must list at least one extension".into(),
            });
        }
        for (field, list) in [
            ("sync.video_formats", &self.sync.video_formats),
            ("sync.transcoded_formats", &self.sync.transcoded_formats),
        ] {
            for ext in list {
                if !self.sync.is_media_extension(ext) {
                    errors.push(ValidationError {
                        field: field.into(),
                        message: format!("'{ext}' is not listed in sync.media_extensions"),
                    });
                }
            }
        }
        for (field, value) in [
            ("sync.folder_workers", self.sync.folder_workers),
            ("sync.file_workers", self.sync.file_workers),
            ("sync.upload_workers", self.sync.upload_workers),
        ] {
            if value == 0 {
                errors.push(ValidationError {
                    field: field.into(),
                    message: "must be greater than 0".into(),
                });
            }
        }

        // --- remote ---
        if self.remote.max_depth == 0 {
            errors.push(ValidationError {
                field: "remote.max_depth".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Programmatic [`Config`] construction, mostly for tests and embedders.
///
/// Unset fields keep their defaults.
///
/// # Example
///
/// ```rust,no_run
/// use mediatree_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .sync_file_workers(8)
///     .remote_max_depth(5)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Builder holding the default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- sync ---

    pub fn sync_media_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync.media_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn sync_video_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync.video_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn sync_folder_workers(mut self, n: usize) -> Self {
        self.config.sync.folder_workers = n;
        self
    }

    pub fn sync_file_workers(mut self, n: usize) -> Self {
        self.config.sync.file_workers = n;
        self
    }

    pub fn sync_upload_workers(mut self, n: usize) -> Self {
        self.config.sync.upload_workers = n;
        self
    }

    pub fn sync_default_privacy(mut self, privacy: Privacy) -> Self {
        self.config.sync.default_privacy = privacy;
        self
    }

    // --- remote ---

    pub fn remote_max_depth(mut self, depth: usize) -> Self {
        self.config.remote.max_depth = depth;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    /// Returns the configuration without validating it.
    pub fn build(self) -> Config {
        self.config
    }

    /// Returns the configuration, or every problem [`Config::validate`] found.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
