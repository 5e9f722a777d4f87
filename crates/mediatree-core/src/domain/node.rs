//! Remote node types
//!
//! [`RemoteEntry`] is the DTO the transport returns for every node it lists
//! or creates. The engine wraps entries in cached handles; the entry itself
//! is immutable once received.

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{errors::DomainError, newtypes::RemoteId};

// ============================================================================
// NodeKind
// ============================================================================

/// Kind of a remote tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Synthetic top of a user's tree
    Root,
    /// Container of folders and albums
    Folder,
    /// Container of files
    Album,
    /// Media file
    File,
}

impl NodeKind {
    /// Returns true for kinds that hold children
    pub fn is_container(self) -> bool {
        !matches!(self, NodeKind::File)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Folder => "folder",
            NodeKind::Album => "album",
            NodeKind::File => "file",
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "root" => Ok(NodeKind::Root),
            "folder" => Ok(NodeKind::Folder),
            "album" => Ok(NodeKind::Album),
            "file" => Ok(NodeKind::File),
            _ => Err(DomainError::UnknownNodeKind(s.to_string())),
        }
    }
}

// ============================================================================
// Privacy
// ============================================================================

/// Visibility applied to newly created folders and albums
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl Privacy {
    /// All accepted values, in display order
    pub const ALL: [Privacy; 3] = [Privacy::Public, Privacy::Unlisted, Privacy::Private];

    pub fn as_str(self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Unlisted => "unlisted",
            Privacy::Private => "private",
        }
    }
}

impl Display for Privacy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privacy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Privacy::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownPrivacy(s.to_string()))
    }
}

// ============================================================================
// RemoteEntry
// ============================================================================

/// File-only attributes recorded by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    /// Lowercased format/extension as recorded remotely, e.g. `jpg`
    pub format: String,
    /// Whether the service treats this file as a video
    pub is_video: bool,
    /// MD5 hex digest of the archived original (absent for some formats)
    pub content_hash: Option<String>,
    /// Server-recorded modification timestamp
    pub modified_time: Option<DateTime<Utc>>,
    /// Size in bytes of the archived original
    pub archived_size: u64,
    /// Locator passed back to `IRemoteClient::download`
    pub download_uri: Option<String>,
}

/// One entry of the remote tree as returned by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: RemoteId,
    pub name: String,
    pub kind: NodeKind,
    /// Present iff `kind == NodeKind::File`
    pub file: Option<FileAttributes>,
}

impl RemoteEntry {
    /// Create a container entry (root, folder or album)
    pub fn container(id: RemoteId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            file: None,
        }
    }

    /// Create a file entry
    pub fn file(id: RemoteId, name: impl Into<String>, attributes: FileAttributes) -> Self {
        Self {
            id,
            name: name.into(),
            kind: NodeKind::File,
            file: Some(attributes),
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }
}
