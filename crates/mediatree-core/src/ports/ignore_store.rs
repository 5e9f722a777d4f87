//! Ignore-list port (driven/secondary port)
//!
//! Each local folder may carry a list of child names that sync skips. The
//! storage format belongs to the adapter; the engine only reads and
//! rewrites whole lists.

use std::{collections::BTreeSet, path::Path};

/// Port trait for per-folder ignore lists
///
/// Uses `anyhow::Result` because storage failures are adapter-specific.
#[async_trait::async_trait]
pub trait IIgnoreStore: Send + Sync {
    /// Returns the names excluded from sync inside `folder`
    ///
    /// A folder without a stored list yields an empty set.
    async fn get(&self, folder: &Path) -> anyhow::Result<BTreeSet<String>>;

    /// Replaces the ignore list of `folder`
    async fn set(&self, folder: &Path, names: &BTreeSet<String>) -> anyhow::Result<()>;
}
