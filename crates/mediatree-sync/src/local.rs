//! Local filesystem side of a sync
//!
//! - [`walk`] enumerates a local directory tree one level per step, pruned
//!   by the per-folder ignore lists, using an explicit stack.
//! - [`JsonIgnoreStore`] implements [`IIgnoreStore`] with a small JSON
//!   settings file (`.mediatree`) stored inside each folder.
//! - [`write_atomic`] writes through a temporary file and a rename.

use std::{
    collections::BTreeSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use mediatree_core::ports::ignore_store::IIgnoreStore;

use crate::SyncError;

/// Name of the per-folder settings file
pub const SETTINGS_FILE_NAME: &str = ".mediatree";

/// Key of the ignore list inside the settings file
const IGNORE_KEY: &str = "ignore";

// ============================================================================
// Directory walk
// ============================================================================

/// One directory level of a local walk
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WalkStep {
    pub dir: PathBuf,
    /// Child directory names, sorted, ignored names removed
    pub subdirs: Vec<String>,
    /// Child file names, sorted, ignored names removed
    pub files: Vec<String>,
}

impl WalkStep {
    /// A synthetic step for loose files of one directory
    pub fn files_only(dir: impl Into<PathBuf>, mut files: Vec<String>) -> Self {
        files.sort();
        Self {
            dir: dir.into(),
            subdirs: Vec::new(),
            files,
        }
    }
}

/// Result of a local walk
#[derive(Debug, Default)]
pub struct LocalWalk {
    /// Every directory level that could be read, sorted by path
    pub steps: Vec<WalkStep>,
    /// One error per directory below the root that could not be read; its
    /// subtree is not part of `steps`
    pub failures: Vec<SyncError>,
}

/// Walks `root` and returns every directory level, sorted by path
///
/// Ignored directories are pruned (never entered) and ignored files are
/// dropped. Symbolic links to directories are listed but not entered.
/// A directory below `root` that cannot be read (or whose ignore list is
/// unusable) is recorded in [`LocalWalk::failures`] and skipped with its
/// subtree; the rest of the tree is still walked. Returns an empty walk if
/// `cancel` fires.
///
/// # Arguments
/// * `root` - Directory to walk
/// * `ignore` - Ignore-list store consulted for every directory
/// * `cancel` - Checked before each directory is read
///
/// # Errors
/// Only when `root` itself cannot be read
#[instrument(skip_all, fields(root = %root.display()))]
pub async fn walk(
    root: &Path,
    ignore: &dyn IIgnoreStore,
    cancel: &CancellationToken,
) -> Result<LocalWalk, SyncError> {
    let mut walk = LocalWalk::default();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        if cancel.is_cancelled() {
            debug!("Walk cancelled");
            return Ok(LocalWalk::default());
        }

        match read_level(&dir, ignore).await {
            Ok((step, children)) => {
                stack.extend(children);
                walk.steps.push(step);
            }
            Err(e) if dir.as_path() == root => return Err(e),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                walk.failures.push(e);
            }
        }
    }

    walk.steps.sort();
    debug!(
        directories = walk.steps.len(),
        failed = walk.failures.len(),
        "Walk complete"
    );
    Ok(walk)
}

/// Reads one directory level and returns it with the subdirectories to enter
async fn read_level(
    dir: &Path,
    ignore: &dyn IIgnoreStore,
) -> Result<(WalkStep, Vec<PathBuf>), SyncError> {
    let ignored = ignore.get(dir).await.map_err(|e| SyncError::IgnoreList {
        path: dir.to_path_buf(),
        message: format!("{e:#}"),
    })?;

    let mut children = Vec::new();
    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| SyncError::local_io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SyncError::local_io(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if ignored.contains(&name) {
            continue;
        }
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| SyncError::local_io(entry.path(), e))?;
        if file_type.is_dir() {
            children.push(entry.path());
            subdirs.push(name);
        } else if file_type.is_symlink() {
            match tokio::fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_dir() => subdirs.push(name),
                Ok(_) => files.push(name),
                Err(e) => debug!(path = %entry.path().display(), error = %e, "Dangling symlink"),
            }
        } else {
            files.push(name);
        }
    }

    subdirs.sort();
    files.sort();
    let step = WalkStep {
        dir: dir.to_path_buf(),
        subdirs,
        files,
    };
    Ok((step, children))
}

// ============================================================================
// JsonIgnoreStore
// ============================================================================

/// Ignore lists stored as `{"ignore": [...]}` in each folder's `.mediatree`
///
/// Other keys in the file are preserved when the list is rewritten.
#[derive(Debug, Clone, Default)]
pub struct JsonIgnoreStore;

impl JsonIgnoreStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Location of the settings file for `folder`
    pub fn settings_path(folder: &Path) -> PathBuf {
        folder.join(SETTINGS_FILE_NAME)
    }

    async fn read_settings(
        folder: &Path,
    ) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
        let path = Self::settings_path(folder);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(serde_json::Map::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

#[async_trait::async_trait]
impl IIgnoreStore for JsonIgnoreStore {
    async fn get(&self, folder: &Path) -> anyhow::Result<BTreeSet<String>> {
        let settings = Self::read_settings(folder).await?;
        let names = match settings.get(IGNORE_KEY) {
            Some(value) => serde_json::from_value(value.clone()).with_context(|| {
                format!(
                    "\"{IGNORE_KEY}\" in {} is not a list of names",
                    Self::settings_path(folder).display()
                )
            })?,
            None => BTreeSet::new(),
        };
        Ok(names)
    }

    #[instrument(skip_all, fields(folder = %folder.display(), count = names.len()))]
    async fn set(&self, folder: &Path, names: &BTreeSet<String>) -> anyhow::Result<()> {
        let mut settings = Self::read_settings(folder).await?;
        settings.insert(IGNORE_KEY.to_string(), serde_json::to_value(names)?);
        let data = serde_json::to_vec_pretty(&settings)?;
        write_atomic(&Self::settings_path(folder), &data).await?;
        debug!("Ignore list updated");
        Ok(())
    }
}

// ============================================================================
// Atomic writes
// ============================================================================

/// Writes `data` to `target` via a sibling temporary file and a rename
pub async fn write_atomic(target: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = {
        let mut p = target.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };

    tokio::fs::write(&tmp_path, data).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, target).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}
