//! MediaTree Sync - Remote tree mirroring engine
//!
//! Provides:
//! - A cached, lazily traversed model of the remote media tree
//! - Path resolution with `.`/`..`, globs, regexes and depth-limited creation
//! - Per-file change decisions (hash, timestamp, transcoded formats)
//! - A three-stage folder/file/upload pipeline with cooperative cancellation
//!
//! ## Modules
//!
//! - [`tree`] - Remote node handles over a versioned per-node children cache
//! - [`resolver`] - Path pattern resolution and auto-creation
//! - [`decision`] - Skip / upload / replace decisions for one local file
//! - [`local`] - Local directory walking and the JSON ignore-list adapter
//! - [`pool`] - Bounded worker pools fed by unbounded queues
//! - [`progress`] - Per-lane progress display
//! - [`pipeline`] - The sync run orchestrating the three pools
//! - [`remote_fs`] - Working directory and one-shot remote file operations
//! - [`logging`] - Tracing subscriber setup

pub mod decision;
pub mod local;
pub mod logging;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod remote_fs;
pub mod resolver;
pub mod tree;

use std::path::PathBuf;

use mediatree_core::domain::errors::RemoteError;
use thiserror::Error;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote operation failed
    #[error("{operation} failed: {source}")]
    Remote {
        /// What the engine was doing, e.g. `list children of "/Trips"`
        operation: String,
        #[source]
        source: RemoteError,
    },

    /// Auto-creation would exceed the remote hierarchy depth
    #[error("Cannot create \"{path}\": folders may not be nested more than {max_levels} levels deep")]
    DepthLimit {
        /// Full path that was requested
        path: String,
        /// Configured maximum folder depth
        max_levels: usize,
    },

    /// A local file or directory could not be read
    #[error("Cannot access \"{}\": {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A glob or regular expression did not compile
    #[error("Invalid pattern \"{pattern}\": {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A path segment did not match any remote node
    #[error("\"{name}\" not found in \"{parent}\"")]
    NotFound { name: String, parent: String },

    /// The requested operation does not apply to the given target
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Local sync sources that matched nothing
    #[error("Not found: {}", .0.join(", "))]
    SourcesNotFound(Vec<String>),

    /// A per-folder ignore list could not be read or written
    #[error("Ignore list for \"{}\" unavailable: {message}", path.display())]
    IgnoreList { path: PathBuf, message: String },
}

impl SyncError {
    /// Wraps a remote failure with the operation that triggered it
    pub fn remote(operation: impl Into<String>, source: RemoteError) -> Self {
        SyncError::Remote {
            operation: operation.into(),
            source,
        }
    }

    /// Wraps a local I/O failure with the offending path
    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::LocalIo {
            path: path.into(),
            source,
        }
    }
}

pub use decision::{ChangeDetector, Decision, LocalFile};
pub use pipeline::{SyncPipeline, SyncReport, SyncRequest, SyncSource, SyncStatus};
pub use progress::{Lane, TaskProgressTracker};
pub use remote_fs::RemoteFs;
pub use resolver::{MatchMode, PathResolver, Resolution};
pub use tree::{RemoteNode, RemoteTree};
