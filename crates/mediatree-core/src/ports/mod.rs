//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the engine depends on,
//! but whose implementations live outside of it.
//!
//! ## Ports Overview
//!
//! - [`IRemoteClient`] - Paginated operations on the remote media tree
//! - [`IIgnoreStore`] - Per-folder lists of local names excluded from sync
//! - [`IMediaProbe`] - Best-effort timestamp extraction from media bytes
//! - [`IConfirmPrompt`] - Yes/no confirmation before destructive work

pub mod ignore_store;
pub mod media_probe;
pub mod prompt;
pub mod remote_client;

pub use ignore_store::IIgnoreStore;
pub use media_probe::{IMediaProbe, NoopMediaProbe};
pub use prompt::{FixedAnswer, IConfirmPrompt};
pub use remote_client::{ChildPage, IRemoteClient, UploadProgress};
