//! Remote client port (driven/secondary port)
//!
//! This module defines the minimal set of operations the sync engine needs
//! from the remote media service. The HTTP transport, authentication and
//! JSON decoding live in the adapter implementing [`IRemoteClient`].
//!
//! ## Design Notes
//!
//! - Every method fails with the uniform [`RemoteError`] so the engine can
//!   report status codes without knowing the transport.
//! - No method retries. Callers decide what a failure means for their task.
//! - Uses `#[async_trait]` for async trait methods.

use crate::domain::{
    errors::RemoteError,
    newtypes::RemoteId,
    node::{NodeKind, Privacy, RemoteEntry},
};

/// Upload progress callback
///
/// Called with the completed percentage (0..=100). Returning `true` asks the
/// transport to stop the transfer early.
pub type UploadProgress = Box<dyn Fn(u8) -> bool + Send + Sync>;

/// One page of a child listing
#[derive(Debug, Clone, Default)]
pub struct ChildPage {
    /// Entries on this page, in service order
    pub entries: Vec<RemoteEntry>,
    /// Token for the next page (`None` on the last page)
    pub next_page_token: Option<String>,
}

/// Port trait for remote media tree operations
///
/// ## Implementation Notes
///
/// - `list_children` is paginated; the engine keeps calling it with the
///   returned token until `next_page_token` is `None`.
/// - `create_child` must not deduplicate silently. When the name already
///   exists the adapter should fail with status 409 so the engine can fold
///   the conflict into a reuse of the existing node.
/// - `upload` reports progress through the callback and should stop early
///   when the callback returns `true`.
#[async_trait::async_trait]
pub trait IRemoteClient: Send + Sync {
    /// Returns the nickname of the authenticated user
    async fn authenticated_user(&self) -> Result<String, RemoteError>;

    /// Returns the root entry of a user's tree
    ///
    /// # Arguments
    /// * `user` - Nickname of the tree owner
    async fn root(&self, user: &str) -> Result<RemoteEntry, RemoteError>;

    /// Lists one page of the children of a container node
    ///
    /// # Arguments
    /// * `node_id` - The container to list
    /// * `page_token` - Token from the previous page, `None` for the first page
    async fn list_children(
        &self,
        node_id: &RemoteId,
        page_token: Option<&str>,
    ) -> Result<ChildPage, RemoteError>;

    /// Creates a folder or album under a container
    ///
    /// # Arguments
    /// * `parent_id` - Container receiving the new node
    /// * `name` - Display name of the new node
    /// * `kind` - `Folder` or `Album`
    /// * `privacy` - Visibility of the new node
    ///
    /// # Returns
    /// The created entry
    async fn create_child(
        &self,
        parent_id: &RemoteId,
        name: &str,
        kind: NodeKind,
        privacy: Privacy,
    ) -> Result<RemoteEntry, RemoteError>;

    /// Deletes a node (and, for containers, everything below it)
    async fn delete(&self, node_id: &RemoteId) -> Result<(), RemoteError>;

    /// Uploads a file into an album
    ///
    /// # Arguments
    /// * `album_id` - Album receiving the file
    /// * `file_name` - Name to record remotely
    /// * `data` - File contents
    /// * `progress` - Percent-complete callback; returns `true` to stop early
    ///
    /// # Returns
    /// The uploaded file entry
    async fn upload(
        &self,
        album_id: &RemoteId,
        file_name: &str,
        data: &[u8],
        progress: UploadProgress,
    ) -> Result<RemoteEntry, RemoteError>;

    /// Downloads file contents from a download locator
    ///
    /// # Arguments
    /// * `uri` - The `download_uri` recorded on a file entry
    async fn download(&self, uri: &str) -> Result<Vec<u8>, RemoteError>;
}
