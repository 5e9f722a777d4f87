//! Change detection between a local file and its remote counterpart
//!
//! [`ChangeDetector::decide`] is a pure function of the local bytes, the
//! local modification time, the remote file attributes and the injected
//! [`IMediaProbe`]. Rules, first match wins:
//!
//! 1. No remote file: upload.
//! 2. Video format: compare the server timestamp with the embedded media
//!    timestamp (falling back to the filesystem mtime); equal within one
//!    second means unchanged. Servers re-encode video, so hashes are useless.
//! 3. Transcoded format with a remote copy: always unchanged. The service
//!    re-encodes and renames these on ingestion and keeps no usable signal.
//! 4. Otherwise compare MD5 digests.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use mediatree_core::{
    config::SyncConfig, domain::node::FileAttributes, ports::media_probe::IMediaProbe,
};

use crate::SyncError;

/// Maximum timestamp difference for a video to count as unchanged
pub const VIDEO_TIME_TOLERANCE_MS: i64 = 1_000;

/// Outcome of comparing one local file with the remote album
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Remote copy is current
    Skip,
    /// No remote copy exists
    UploadNew,
    /// Remote copy is stale; delete it and upload again
    ReplaceAndUpload,
}

// ============================================================================
// LocalFile
// ============================================================================

/// A local media file loaded for comparison
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: PathBuf,
    /// File name with surrounding whitespace trimmed
    pub name: String,
    pub content: Vec<u8>,
    /// Filesystem modification time
    pub modified: Option<DateTime<Utc>>,
}

impl LocalFile {
    /// Reads a file's bytes and modification time
    ///
    /// # Errors
    /// Returns `SyncError::LocalIo` if the file cannot be read
    pub async fn read(path: &Path) -> Result<Self, SyncError> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| SyncError::local_io(path, e))?;
        let modified = tokio::fs::metadata(path)
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Ok(Self::new(path, content, modified))
    }

    /// Builds a file from already-loaded contents
    pub fn new(path: impl Into<PathBuf>, content: Vec<u8>, modified: Option<DateTime<Utc>>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().trim().to_string())
            .unwrap_or_default();
        Self {
            path,
            name,
            content,
            modified,
        }
    }

    /// Extension without the dot, as written
    pub fn extension(&self) -> Option<&str> {
        extension_of(&self.name)
    }

    /// MD5 hex digest of the contents
    pub fn md5_hex(&self) -> String {
        md5_hex(&self.content)
    }
}

/// Extension of a file name without the dot; `None` for dotfiles and bare names
pub fn extension_of(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Lowercase hex MD5 digest
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

// ============================================================================
// ChangeDetector
// ============================================================================

/// Decides whether a local file must be uploaded
#[derive(Clone)]
pub struct ChangeDetector {
    video_formats: Vec<String>,
    transcoded_formats: Vec<String>,
    probe: Arc<dyn IMediaProbe>,
}

impl ChangeDetector {
    pub fn new(config: &SyncConfig, probe: Arc<dyn IMediaProbe>) -> Self {
        Self {
            video_formats: config.video_formats.clone(),
            transcoded_formats: config.transcoded_formats.clone(),
            probe,
        }
    }

    fn is_video(&self, ext: &str) -> bool {
        self.video_formats.iter().any(|f| f.eq_ignore_ascii_case(ext))
    }

    fn is_transcoded(&self, ext: &str) -> bool {
        self.transcoded_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(ext))
    }

    /// Name under which the remote service stores `file_name`
    ///
    /// Transcoded files are converted to JPEG and renamed, e.g.
    /// `IMG_0001.heic` becomes `IMG_0001_heic.JPG`.
    pub fn remote_name_for(&self, file_name: &str) -> String {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && self.is_transcoded(ext) => {
                format!("{stem}_{ext}.JPG")
            }
            _ => file_name.to_string(),
        }
    }

    /// Compares a local file with its remote counterpart
    ///
    /// # Arguments
    /// * `local` - The local file
    /// * `remote` - Attributes of the remote file with the same remote name
    pub fn decide(&self, local: &LocalFile, remote: Option<&FileAttributes>) -> Decision {
        let Some(remote) = remote else {
            return Decision::UploadNew;
        };
        let ext = local.extension().unwrap_or_default();

        if self.is_video(ext) {
            return self.decide_by_timestamp(local, remote);
        }

        if self.is_transcoded(ext) {
            info!(
                file = %local.path.display(),
                "Remote copy of transcoded file exists; local edits to it are never re-synced"
            );
            return Decision::Skip;
        }

        match remote.content_hash.as_deref() {
            Some(hash) if hash.eq_ignore_ascii_case(&local.md5_hex()) => Decision::Skip,
            Some(_) => Decision::ReplaceAndUpload,
            None => {
                debug!(file = %local.path.display(), "Remote file has no recorded hash");
                Decision::ReplaceAndUpload
            }
        }
    }

    fn decide_by_timestamp(&self, local: &LocalFile, remote: &FileAttributes) -> Decision {
        let Some(remote_time) = remote.modified_time else {
            debug!(file = %local.path.display(), "Remote video has no timestamp");
            return Decision::ReplaceAndUpload;
        };

        let local_time = match self.probe.extract_timestamp(&local.content) {
            Some(time) => Some(time),
            None => {
                warn!(
                    file = %local.path.display(),
                    "Failed extracting metadata, using file modification time"
                );
                local.modified
            }
        };
        let Some(local_time) = local_time else {
            return Decision::ReplaceAndUpload;
        };

        let delta_ms = (remote_time - local_time).num_milliseconds().abs();
        if delta_ms <= VIDEO_TIME_TOLERANCE_MS {
            Decision::Skip
        } else {
            Decision::ReplaceAndUpload
        }
    }
}
