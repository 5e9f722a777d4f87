//! Client-side model of the remote media tree
//!
//! [`RemoteTree`] owns one cache entry per container node, keyed by the
//! node's [`RemoteId`]. Each entry carries the last fetched child list and a
//! monotonically increasing version. Every mutation (child created, cache
//! invalidated) bumps the version; a listing only installs its result when
//! the version it observed before fetching is still current, so a slow
//! listing can never overwrite a newer mutation.
//!
//! [`RemoteNode`] is a cheap, cloneable handle: the shared tree, the node's
//! immutable entry, its path and its parent's id. Handles never own their
//! children, so there is no ownership cycle between parent and child.
//!
//! ## Bounded cache
//!
//! [`RemoteTree::set_max_cached_nodes`] caps how many nodes keep a child
//! list. Past the cap the least recently used lists are dropped (versions
//! are kept, so an in-flight listing can still be rejected). A sync run sets
//! the cap from its worker counts; left unset the cache is unbounded.
//!
//! ## Concurrency
//!
//! Cache reads and version bumps go through `DashMap` shard locks and never
//! span an `.await`. Check-then-create sequences are serialized per parent
//! node by an async mutex, so two workers asking for the same missing child
//! issue a single create call. A mutex nobody holds is removed again.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use mediatree_core::{
    domain::{
        newtypes::{RemoteId, RemotePath},
        node::{FileAttributes, NodeKind, Privacy, RemoteEntry},
    },
    ports::remote_client::{IRemoteClient, UploadProgress},
};

use crate::SyncError;

type ChildList = Arc<Vec<Arc<RemoteEntry>>>;

/// Cached state of one container node
#[derive(Debug, Default)]
struct CacheEntry {
    version: u64,
    /// Tick of the last read or write of `children`
    last_used: u64,
    children: Option<ChildList>,
}

// ============================================================================
// RemoteTree
// ============================================================================

/// Shared children cache over an [`IRemoteClient`]
pub struct RemoteTree {
    client: Arc<dyn IRemoteClient>,
    cache: DashMap<RemoteId, CacheEntry>,
    locks: DashMap<RemoteId, Arc<Mutex<()>>>,
    /// 0 means unbounded
    max_cached: AtomicUsize,
    clock: AtomicU64,
}

impl RemoteTree {
    /// Creates an empty tree cache over `client`
    pub fn new(client: Arc<dyn IRemoteClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            cache: DashMap::new(),
            locks: DashMap::new(),
            max_cached: AtomicUsize::new(0),
            clock: AtomicU64::new(0),
        })
    }

    /// Caps the number of nodes whose children stay cached
    ///
    /// `None` removes the cap. Lowering it evicts immediately.
    pub fn set_max_cached_nodes(&self, max: Option<usize>) {
        let max = max.map_or(0, |max| max.max(1));
        self.max_cached.store(max, Ordering::Relaxed);
        debug!(max, "Children cache limit set");
        self.evict(None);
    }

    /// Current cap, `None` when unbounded
    pub fn max_cached_nodes(&self) -> Option<usize> {
        match self.max_cached.load(Ordering::Relaxed) {
            0 => None,
            max => Some(max),
        }
    }

    /// Number of per-node creation locks currently allocated
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// The transport this tree talks to
    pub fn client(&self) -> &Arc<dyn IRemoteClient> {
        &self.client
    }

    /// Fetches the root node of `user`'s tree
    #[instrument(skip(self))]
    pub async fn root(self: &Arc<Self>, user: &str) -> Result<RemoteNode, SyncError> {
        let entry = self
            .client
            .root(user)
            .await
            .map_err(|e| SyncError::remote(format!("fetch root of user \"{user}\""), e))?;
        Ok(RemoteNode {
            tree: Arc::clone(self),
            entry: Arc::new(entry),
            path: RemotePath::root(),
            parent_id: None,
        })
    }

    /// Current cache version of a node (0 if never touched)
    pub fn cache_version(&self, id: &RemoteId) -> u64 {
        self.cache.get(id).map(|entry| entry.version).unwrap_or(0)
    }

    /// Number of nodes whose children are currently cached
    pub fn cached_nodes(&self) -> usize {
        self.cache
            .iter()
            .filter(|entry| entry.children.is_some())
            .count()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn cached_children(&self, id: &RemoteId) -> Option<ChildList> {
        let mut entry = self.cache.get_mut(id)?;
        let children = entry.children.clone()?;
        entry.last_used = self.tick();
        Some(children)
    }

    /// Drops the least recently used child lists above the cap
    ///
    /// `keep` is never evicted. Must not be called while holding a cache
    /// entry.
    fn evict(&self, keep: Option<&RemoteId>) {
        let max = self.max_cached.load(Ordering::Relaxed);
        if max == 0 {
            return;
        }
        let mut cached: Vec<(u64, RemoteId)> = self
            .cache
            .iter()
            .filter(|entry| entry.children.is_some())
            .map(|entry| (entry.last_used, entry.key().clone()))
            .collect();
        if cached.len() <= max {
            return;
        }
        cached.sort();
        let excess = cached.len() - max;
        let mut evicted = 0;
        for (_, id) in cached {
            if evicted == excess {
                break;
            }
            if Some(&id) == keep {
                continue;
            }
            if let Some(mut entry) = self.cache.get_mut(&id) {
                entry.children = None;
                evicted += 1;
            }
        }
        debug!(evicted, max, "Evicted cached child lists");
    }

    async fn fetch_children(
        &self,
        id: &RemoteId,
        path: &RemotePath,
    ) -> Result<Vec<Arc<RemoteEntry>>, SyncError> {
        let mut children = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .client
                .list_children(id, page_token.as_deref())
                .await
                .map_err(|e| SyncError::remote(format!("list children of \"{path}\""), e))?;
            pages += 1;
            children.extend(page.entries.into_iter().map(Arc::new));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(path = %path, pages, count = children.len(), "Fetched children");
        Ok(children)
    }

    /// Stores a fetched listing unless the node changed while fetching
    fn install(&self, id: &RemoteId, observed: u64, children: ChildList) -> bool {
        {
            let mut entry = self.cache.entry(id.clone()).or_default();
            if entry.version != observed {
                return false;
            }
            entry.children = Some(children);
            entry.last_used = self.tick();
        }
        self.evict(Some(id));
        true
    }

    /// Appends a freshly created child in place and bumps the version
    fn append_child(&self, id: &RemoteId, child: Arc<RemoteEntry>) {
        {
            let mut entry = self.cache.entry(id.clone()).or_default();
            let mut children: Vec<Arc<RemoteEntry>> = entry
                .children
                .as_ref()
                .map(|list| list.as_ref().clone())
                .unwrap_or_default();
            children.push(child);
            entry.children = Some(Arc::new(children));
            entry.version += 1;
            entry.last_used = self.tick();
        }
        self.evict(Some(id));
    }

    fn invalidate(&self, id: &RemoteId) {
        let mut entry = self.cache.entry(id.clone()).or_default();
        entry.children = None;
        entry.version += 1;
    }

    /// Drops all state of a node that no longer exists remotely
    fn forget(&self, id: &RemoteId) {
        if let Some(mut entry) = self.cache.get_mut(id) {
            entry.children = None;
            entry.version += 1;
        }
        self.locks.remove(id);
    }

    fn lock_for(&self, id: &RemoteId) -> Arc<Mutex<()>> {
        self.locks.entry(id.clone()).or_default().clone()
    }

    /// Removes the creation lock of `id` once no task holds a handle to it
    fn release_lock(&self, id: &RemoteId, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

// ============================================================================
// RemoteNode
// ============================================================================

/// Handle to one entry of the remote tree
#[derive(Clone)]
pub struct RemoteNode {
    tree: Arc<RemoteTree>,
    entry: Arc<RemoteEntry>,
    path: RemotePath,
    parent_id: Option<RemoteId>,
}

impl fmt::Debug for RemoteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteNode")
            .field("id", &self.entry.id)
            .field("kind", &self.entry.kind)
            .field("path", &self.path.to_string())
            .finish()
    }
}

impl RemoteNode {
    pub fn id(&self) -> &RemoteId {
        &self.entry.id
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn kind(&self) -> NodeKind {
        self.entry.kind
    }

    pub fn entry(&self) -> &RemoteEntry {
        &self.entry
    }

    /// File attributes, `None` for containers
    pub fn file(&self) -> Option<&FileAttributes> {
        self.entry.file.as_ref()
    }

    pub fn path(&self) -> &RemotePath {
        &self.path
    }

    pub fn parent_id(&self) -> Option<&RemoteId> {
        self.parent_id.as_ref()
    }

    pub fn is_container(&self) -> bool {
        self.entry.kind.is_container()
    }

    pub fn tree(&self) -> &Arc<RemoteTree> {
        &self.tree
    }

    /// Version of this node's children cache
    pub fn cache_version(&self) -> u64 {
        self.tree.cache_version(self.id())
    }

    fn child_handle(&self, entry: Arc<RemoteEntry>) -> RemoteNode {
        RemoteNode {
            path: self.path.child(entry.name.clone()),
            tree: Arc::clone(&self.tree),
            parent_id: Some(self.entry.id.clone()),
            entry,
        }
    }

    fn handles(&self, entries: &[Arc<RemoteEntry>]) -> Vec<RemoteNode> {
        entries
            .iter()
            .map(|entry| self.child_handle(Arc::clone(entry)))
            .collect()
    }

    /// Returns the children of this node
    ///
    /// Served from the cache unless the cached list is missing or empty or
    /// `force_refresh` is set, in which case every page is fetched and the
    /// result replaces the cache.
    ///
    /// # Arguments
    /// * `force_refresh` - Bypass the cache
    pub async fn get_children(&self, force_refresh: bool) -> Result<Vec<RemoteNode>, SyncError> {
        if !self.is_container() {
            return Ok(Vec::new());
        }

        if !force_refresh {
            if let Some(cached) = self.tree.cached_children(self.id()) {
                if !cached.is_empty() {
                    return Ok(self.handles(&cached));
                }
            }
        }

        let observed = self.tree.cache_version(self.id());
        let fetched = Arc::new(self.tree.fetch_children(self.id(), &self.path).await?);
        if !self.tree.install(self.id(), observed, Arc::clone(&fetched)) {
            debug!(path = %self.path, "Listing raced with a mutation, not caching it");
        }
        Ok(self.handles(&fetched))
    }

    /// Returns the child named exactly `name` (case-sensitive)
    pub async fn get_child(&self, name: &str) -> Result<Option<RemoteNode>, SyncError> {
        Ok(self
            .get_children(false)
            .await?
            .into_iter()
            .find(|child| child.name() == name))
    }

    /// Returns true when the node has at least one child
    pub async fn has_children(&self) -> Result<bool, SyncError> {
        Ok(!self.get_children(false).await?.is_empty())
    }

    /// Returns the child named `name`, creating it when missing
    ///
    /// The create is appended to the cached children in place. A create
    /// refused with a conflict status is folded into a refresh and a reuse
    /// of the existing child.
    ///
    /// # Arguments
    /// * `name` - Child name
    /// * `kind` - `Folder` or `Album`
    /// * `privacy` - Visibility for a newly created child
    #[instrument(skip(self), fields(parent = %self.path))]
    pub async fn get_or_create_child(
        &self,
        name: &str,
        kind: NodeKind,
        privacy: Privacy,
    ) -> Result<RemoteNode, SyncError> {
        let lock = self.tree.lock_for(self.id());
        let result = {
            let _guard = lock.lock().await;
            self.create_child_locked(name, kind, privacy).await
        };
        self.tree.release_lock(self.id(), lock);
        result
    }

    async fn create_child_locked(
        &self,
        name: &str,
        kind: NodeKind,
        privacy: Privacy,
    ) -> Result<RemoteNode, SyncError> {
        if let Some(existing) = self.get_child(name).await? {
            return Ok(existing);
        }

        let created = self
            .tree
            .client
            .create_child(self.id(), name, kind, privacy)
            .await;

        match created {
            Ok(entry) => {
                let entry = Arc::new(entry);
                self.tree.append_child(self.id(), Arc::clone(&entry));
                info!(path = %self.path, name, kind = %kind, "Created remote node");
                Ok(self.child_handle(entry))
            }
            Err(err) if err.is_conflict() => {
                warn!(path = %self.path, name, "Create conflicted, reusing existing node");
                self.get_children(true)
                    .await?
                    .into_iter()
                    .find(|child| child.name() == name)
                    .ok_or_else(|| {
                        SyncError::remote(format!("create \"{name}\" in \"{}\"", self.path), err)
                    })
            }
            Err(err) => Err(SyncError::remote(
                format!("create \"{name}\" in \"{}\"", self.path),
                err,
            )),
        }
    }

    /// Clears the children cache; the next listing fetches fresh state
    pub fn invalidate_cache(&self) {
        self.tree.invalidate(self.id());
    }

    /// Clears the parent's children cache, e.g. after [`RemoteNode::delete`]
    pub fn invalidate_parent_cache(&self) {
        if let Some(parent_id) = &self.parent_id {
            self.tree.invalidate(parent_id);
        }
    }

    /// Deletes this node remotely
    ///
    /// The parent's cache is left untouched so batch deletions can
    /// invalidate it once at the end.
    #[instrument(skip(self), fields(path = %self.path))]
    pub async fn delete(&self) -> Result<(), SyncError> {
        self.tree
            .client
            .delete(self.id())
            .await
            .map_err(|e| SyncError::remote(format!("delete \"{}\"", self.path), e))?;
        self.tree.forget(self.id());
        info!("Deleted remote node");
        Ok(())
    }

    /// Uploads a file into this album
    ///
    /// The album cache is not invalidated here; callers decide when.
    ///
    /// # Arguments
    /// * `file_name` - Remote name of the file
    /// * `data` - File contents
    /// * `progress` - Percent callback; returns `true` to stop the transfer
    pub async fn upload(
        &self,
        file_name: &str,
        data: &[u8],
        progress: UploadProgress,
    ) -> Result<RemoteNode, SyncError> {
        if self.kind() != NodeKind::Album {
            return Err(SyncError::InvalidTarget(format!(
                "\"{}\" is not an album",
                self.path
            )));
        }
        let entry = self
            .tree
            .client
            .upload(self.id(), file_name, data, progress)
            .await
            .map_err(|e| {
                SyncError::remote(format!("upload \"{file_name}\" to \"{}\"", self.path), e)
            })?;
        Ok(self.child_handle(Arc::new(entry)))
    }

    /// Downloads this file's contents
    pub async fn download(&self) -> Result<Vec<u8>, SyncError> {
        let uri = self
            .file()
            .and_then(|file| file.download_uri.as_deref())
            .ok_or_else(|| {
                SyncError::InvalidTarget(format!("\"{}\" is not a downloadable file", self.path))
            })?;
        self.tree
            .client
            .download(uri)
            .await
            .map_err(|e| SyncError::remote(format!("download \"{}\"", self.path), e))
    }
}
