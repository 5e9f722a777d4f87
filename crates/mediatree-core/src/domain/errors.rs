//! Domain error types
//!
//! This module defines error types specific to domain operations
//! (identifier and path validation) and the uniform failure reported by
//! the remote service transport.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Unknown node kind string
    #[error("Unknown node kind: {0}")]
    UnknownNodeKind(String),

    /// Unknown privacy level string
    #[error("Unknown privacy level: {0}")]
    UnknownPrivacy(String),
}

/// Failure of a single remote operation
///
/// Carries the HTTP-equivalent status code returned by the service (or `0`
/// when the request never reached it) and the service's message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("remote error {status}: {message}")]
pub struct RemoteError {
    /// HTTP-equivalent status code
    pub status: u16,
    /// Human-readable message from the service or transport
    pub message: String,
}

impl RemoteError {
    /// Status used by the service when a name already exists under a parent.
    pub const CONFLICT: u16 = 409;

    /// Status used by the service for unknown nodes.
    pub const NOT_FOUND: u16 = 404;

    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Returns true when the service refused a create because the name is taken.
    pub fn is_conflict(&self) -> bool {
        self.status == Self::CONFLICT
    }

    /// Returns true when the addressed node does not exist remotely.
    pub fn is_not_found(&self) -> bool {
        self.status == Self::NOT_FOUND
    }
}
