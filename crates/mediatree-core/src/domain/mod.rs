//! Domain types
//!
//! This module contains the core domain types for MediaTree:
//! - Newtypes for remote identifiers and remote paths
//! - Node kinds, privacy levels and the remote entry DTO
//! - Path patterns as typed by users
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod node;
pub mod pattern;

// Re-export commonly used types
pub use errors::{DomainError, RemoteError};
pub use newtypes::{RemoteId, RemotePath};
pub use node::{FileAttributes, NodeKind, Privacy, RemoteEntry};
pub use pattern::{PathPattern, PatternSegment};
