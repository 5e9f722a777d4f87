//! One-shot remote file operations
//!
//! [`RemoteFs`] keeps a remote working directory and implements the
//! shell-style commands built on the tree cache and the resolver: `cd`,
//! `pwd`, `mkdir`/`mkalbum` ([`RemoteFs::make_node`]), `rmdir`, `rm`,
//! `upload`, `download` and the local `ignore`/`include` lists.
//!
//! Relative paths start at the working directory only when the addressed
//! user is the authenticated user; other users' trees are always walked
//! from their root.
//!
//! Per-path problems (missing node, declined prompt, existing file) are
//! returned as [`FsOutcome`] entries so one bad path never stops the rest.

use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{info, instrument, warn};

use mediatree_core::{
    config::Config,
    domain::{
        newtypes::RemotePath,
        node::{NodeKind, Privacy},
        pattern::PathPattern,
    },
    ports::{ignore_store::IIgnoreStore, prompt::IConfirmPrompt},
};

use crate::{
    decision::LocalFile,
    local::write_atomic,
    resolver::{MatchMode, PathResolver, Resolution},
    tree::{RemoteNode, RemoteTree},
    SyncError,
};

/// Result of one path handled by a [`RemoteFs`] command
#[derive(Debug)]
pub enum FsOutcome {
    Created(RemotePath),
    Removed(RemotePath),
    Uploaded(RemotePath),
    Downloaded(PathBuf),
    /// Nothing was done for `path`
    Skipped { path: String, reason: String },
    /// The command failed for `path`; other paths were still processed
    Failed { path: String, error: SyncError },
}

impl FsOutcome {
    fn skipped(path: impl Into<String>, reason: impl Into<String>) -> Self {
        let (path, reason) = (path.into(), reason.into());
        info!(path = %path, reason = %reason, "Skipped");
        FsOutcome::Skipped { path, reason }
    }

    fn failed(path: impl Into<String>, error: SyncError) -> Self {
        let path = path.into();
        warn!(path = %path, error = %error, "Operation failed");
        FsOutcome::Failed { path, error }
    }
}

// ============================================================================
// RemoteFs
// ============================================================================

/// Remote working directory plus shell-style operations
pub struct RemoteFs {
    tree: Arc<RemoteTree>,
    resolver: PathResolver,
    ignore: Arc<dyn IIgnoreStore>,
    prompt: Arc<dyn IConfirmPrompt>,
    cwd: RwLock<RemotePath>,
}

impl RemoteFs {
    /// Creates a remote filesystem rooted at `/`
    ///
    /// # Arguments
    /// * `tree` - Remote tree cache
    /// * `config` - Supplies the folder depth limit
    /// * `ignore` - Ignore-list storage (IIgnoreStore)
    /// * `prompt` - Confirmation for deletions (IConfirmPrompt)
    pub fn new(
        tree: Arc<RemoteTree>,
        config: &Config,
        ignore: Arc<dyn IIgnoreStore>,
        prompt: Arc<dyn IConfirmPrompt>,
    ) -> Self {
        Self {
            tree,
            resolver: PathResolver::new(config.remote.max_depth),
            ignore,
            prompt,
            cwd: RwLock::new(RemotePath::root()),
        }
    }

    pub fn tree(&self) -> &Arc<RemoteTree> {
        &self.tree
    }

    /// Current working directory
    pub fn pwd(&self) -> RemotePath {
        self.cwd
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Root of `user`'s tree and the working directory applicable to it
    async fn start(
        &self,
        user: Option<&str>,
    ) -> Result<(RemoteNode, Option<RemotePath>), SyncError> {
        let authenticated = self
            .tree
            .client()
            .authenticated_user()
            .await
            .map_err(|e| SyncError::remote("fetch authenticated user", e))?;
        let user = user.unwrap_or(authenticated.as_str());
        let cwd = (user == authenticated).then(|| self.pwd());
        let root = self.tree.root(user).await?;
        Ok((root, cwd))
    }

    /// Walks `path` as far as it matches (exact names)
    pub async fn resolve(&self, user: Option<&str>, path: &str) -> Result<Resolution, SyncError> {
        let (root, cwd) = self.start(user).await?;
        self.resolver
            .resolve(root, cwd.as_ref(), &PathPattern::parse(path), MatchMode::Exact)
            .await
    }

    /// Nodes designated by `path`, its last segment acting as a wildcard
    pub async fn resolve_multiple(
        &self,
        user: Option<&str>,
        path: &str,
        mode: MatchMode,
        directories_only: bool,
    ) -> Result<Vec<RemoteNode>, SyncError> {
        let (root, cwd) = self.start(user).await?;
        self.resolver
            .resolve_multiple(
                root,
                cwd.as_ref(),
                &PathPattern::parse(path),
                mode,
                directories_only,
            )
            .await
    }

    /// Nodes matching `pattern`, every segment acting as a wildcard
    pub async fn expand(
        &self,
        user: Option<&str>,
        pattern: &str,
        mode: MatchMode,
    ) -> Result<Vec<RemoteNode>, SyncError> {
        let (root, cwd) = self.start(user).await?;
        self.resolver
            .expand(root, cwd.as_ref(), &PathPattern::parse(pattern), mode)
            .await
    }

    /// Changes the working directory
    ///
    /// # Errors
    /// `NotFound` when part of `path` does not exist, `InvalidTarget` when it
    /// designates a file
    #[instrument(skip(self))]
    pub async fn cd(&self, path: &str) -> Result<RemotePath, SyncError> {
        let resolution = self.resolve(None, path).await?;
        if !resolution.is_complete() {
            return Err(resolution.not_found());
        }
        let node = resolution.deepest();
        if !node.is_container() {
            return Err(SyncError::InvalidTarget(format!(
                "\"{}\" is not a folder or album",
                node.path()
            )));
        }
        let new_cwd = node.path().clone();
        *self.cwd.write().unwrap_or_else(PoisonError::into_inner) = new_cwd.clone();
        info!(cwd = %new_cwd, "Changed directory");
        Ok(new_cwd)
    }

    /// Creates folders or albums (`mkdir` / `mkalbum`)
    ///
    /// Without `create_parents` only the last segment of a path may be
    /// missing. Existing paths are reported, never recreated.
    ///
    /// # Arguments
    /// * `user` - Tree owner; the authenticated user when `None`
    /// * `paths` - Paths to create
    /// * `create_parents` - Also create missing intermediate folders
    /// * `kind` - Kind of the last segment (`Folder` or `Album`)
    /// * `privacy` - Privacy of created nodes
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn make_node(
        &self,
        user: Option<&str>,
        paths: &[String],
        create_parents: bool,
        kind: NodeKind,
        privacy: Privacy,
    ) -> Result<Vec<FsOutcome>, SyncError> {
        if !matches!(kind, NodeKind::Folder | NodeKind::Album) {
            return Err(SyncError::InvalidTarget(format!("cannot create a {kind} node")));
        }

        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let resolution = self.resolve(user, path).await?;
            if resolution.is_complete() {
                outcomes.push(FsOutcome::skipped(path, "path already exists"));
                continue;
            }
            if resolution.unmatched.len() > 1 && !create_parents {
                outcomes.push(FsOutcome::failed(path, resolution.not_found()));
                continue;
            }
            match self.resolver.resolve_or_create(resolution, kind, privacy).await {
                Ok(chain) => {
                    if let Some(created) = chain.last() {
                        outcomes.push(FsOutcome::Created(created.path().clone()));
                    }
                }
                Err(e) => outcomes.push(FsOutcome::failed(path, e)),
            }
        }
        Ok(outcomes)
    }

    /// Removes folders or albums (`rmdir`)
    ///
    /// The root is never removed. A non-empty node stops the command unless
    /// `recurse` is set. With `remove_parents`, ancestors left empty are
    /// removed too.
    #[instrument(skip(self, dirs), fields(count = dirs.len()))]
    pub async fn rmdir(
        &self,
        user: Option<&str>,
        remove_parents: bool,
        recurse: bool,
        force: bool,
        dirs: &[String],
    ) -> Result<Vec<FsOutcome>, SyncError> {
        let mut outcomes = Vec::new();
        for dir in dirs {
            let resolution = self.resolve(user, dir).await?;
            if !resolution.is_complete() {
                outcomes.push(FsOutcome::failed(dir, resolution.not_found()));
                continue;
            }
            let chain = resolution.matched;
            let mut index = chain.len() - 1;
            if index == 0 {
                outcomes.push(FsOutcome::skipped(dir, "the root cannot be removed"));
                continue;
            }
            let node = &chain[index];
            if !node.is_container() {
                outcomes.push(FsOutcome::skipped(
                    node.path().to_string(),
                    "not a folder or album",
                ));
                continue;
            }

            let non_empty = !node.get_children(true).await?.is_empty();
            if non_empty && !recurse {
                outcomes.push(FsOutcome::skipped(
                    node.path().to_string(),
                    format!("{} is not empty", node.kind()),
                ));
                break;
            }
            if !force {
                let question = format!(
                    "Remove {} {} node \"{}\"?",
                    if non_empty { "non-empty" } else { "empty" },
                    node.kind(),
                    node.path()
                );
                if !self.prompt.confirm(&question).await {
                    outcomes.push(FsOutcome::skipped(node.path().to_string(), "declined"));
                    continue;
                }
            }

            if let Err(e) = node.delete().await {
                outcomes.push(FsOutcome::failed(dir, e));
                continue;
            }
            outcomes.push(FsOutcome::Removed(node.path().clone()));
            chain[index - 1].invalidate_cache();

            if remove_parents {
                while index > 1 {
                    index -= 1;
                    let parent = &chain[index];
                    if parent.has_children().await? {
                        break;
                    }
                    if let Err(e) = parent.delete().await {
                        outcomes.push(FsOutcome::failed(parent.path().to_string(), e));
                        break;
                    }
                    outcomes.push(FsOutcome::Removed(parent.path().clone()));
                    chain[index - 1].invalidate_cache();
                }
            }
        }
        Ok(outcomes)
    }

    /// Removes the nodes designated by each path (`rm`)
    ///
    /// Non-empty containers require `recursive`.
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn rm(
        &self,
        user: Option<&str>,
        force: bool,
        recursive: bool,
        paths: &[String],
    ) -> Result<Vec<FsOutcome>, SyncError> {
        let mut outcomes = Vec::new();
        for path in paths {
            let nodes = self
                .resolve_multiple(user, path, MatchMode::Exact, true)
                .await?;
            if nodes.is_empty() {
                outcomes.push(FsOutcome::skipped(path, "not found"));
            }
            for node in nodes {
                if node.is_container() && !recursive && node.has_children().await? {
                    outcomes.push(FsOutcome::skipped(
                        node.path().to_string(),
                        format!("{} is not empty", node.kind()),
                    ));
                    continue;
                }
                let question = format!("Remove {} node \"{}\"?", node.kind(), node.path());
                if !force && !self.prompt.confirm(&question).await {
                    outcomes.push(FsOutcome::skipped(node.path().to_string(), "declined"));
                    continue;
                }
                match node.delete().await {
                    Ok(()) => {
                        node.invalidate_parent_cache();
                        outcomes.push(FsOutcome::Removed(node.path().clone()));
                    }
                    Err(e) => outcomes.push(FsOutcome::failed(node.path().to_string(), e)),
                }
            }
        }
        Ok(outcomes)
    }

    /// Uploads local files (paths or glob patterns) into an existing album
    ///
    /// Files whose name already exists in the album are skipped. The first
    /// failed upload ends the command.
    ///
    /// # Errors
    /// `NotFound` when the album does not exist, `InvalidTarget` when the
    /// path is not an album
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn upload(
        &self,
        user: Option<&str>,
        files: &[String],
        album: &str,
    ) -> Result<Vec<FsOutcome>, SyncError> {
        let resolution = self.resolve(user, album).await?;
        if !resolution.is_complete() {
            return Err(resolution.not_found());
        }
        let node = resolution.deepest().clone();
        if node.kind() != NodeKind::Album {
            return Err(SyncError::InvalidTarget(format!(
                "\"{}\" is not an album",
                node.path()
            )));
        }

        let mut outcomes = Vec::new();
        for pattern in files {
            let paths = glob::glob(pattern).map_err(|e| SyncError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            for path in paths.filter_map(Result::ok) {
                let shown = path.display().to_string();
                let local = match LocalFile::read(&path).await {
                    Ok(local) => local,
                    Err(e) => {
                        outcomes.push(FsOutcome::failed(shown, e));
                        continue;
                    }
                };
                if node.get_child(&local.name).await?.is_some() {
                    outcomes.push(FsOutcome::skipped(
                        shown,
                        format!("file already exists in album \"{}\"", node.path()),
                    ));
                    continue;
                }

                info!(file = %shown, album = %node.path(), "Uploading");
                match node
                    .upload(&local.name, &local.content, Box::new(|_percent: u8| false))
                    .await
                {
                    Ok(uploaded) => outcomes.push(FsOutcome::Uploaded(uploaded.path().clone())),
                    Err(e) => {
                        outcomes.push(FsOutcome::failed(shown, e));
                        node.invalidate_cache();
                        return Ok(outcomes);
                    }
                }
            }
        }
        node.invalidate_cache();
        Ok(outcomes)
    }

    /// Downloads file nodes into `dest_dir`
    ///
    /// Existing local files are kept unless `force` is set.
    #[instrument(skip(self, paths), fields(count = paths.len(), dest = %dest_dir.display()))]
    pub async fn download(
        &self,
        user: Option<&str>,
        force: bool,
        paths: &[String],
        dest_dir: &Path,
    ) -> Result<Vec<FsOutcome>, SyncError> {
        let mut outcomes = Vec::new();
        for path in paths {
            for node in self
                .resolve_multiple(user, path, MatchMode::Exact, true)
                .await?
            {
                if node.file().is_none() {
                    outcomes.push(FsOutcome::skipped(
                        node.path().to_string(),
                        "not a downloadable file",
                    ));
                    continue;
                }
                let target = dest_dir.join(node.name());
                if !force && tokio::fs::try_exists(&target).await.unwrap_or(false) {
                    outcomes.push(FsOutcome::skipped(
                        target.display().to_string(),
                        "already exists",
                    ));
                    continue;
                }

                let data = match node.download().await {
                    Ok(data) => data,
                    Err(e) => {
                        outcomes.push(FsOutcome::failed(node.path().to_string(), e));
                        continue;
                    }
                };
                info!(file = %node.path(), size = data.len(), "Downloaded");
                match write_atomic(&target, &data).await {
                    Ok(()) => outcomes.push(FsOutcome::Downloaded(target)),
                    Err(e) => outcomes.push(FsOutcome::failed(
                        node.path().to_string(),
                        SyncError::local_io(&target, e),
                    )),
                }
            }
        }
        Ok(outcomes)
    }

    /// Adds names to (`ignore`) or removes them from (`include`) the ignore
    /// list of their parent folder
    ///
    /// # Errors
    /// `LocalIo` when a folder or file does not exist; no list is changed
    /// for that folder or any later one
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn ignore_or_include(&self, paths: &[PathBuf], ignore: bool) -> Result<(), SyncError> {
        let mut by_folder: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();
        for path in paths {
            let folder = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            if let Some(name) = path.file_name() {
                by_folder
                    .entry(folder)
                    .or_default()
                    .insert(name.to_string_lossy().into_owned());
            }
        }

        for (folder, names) in by_folder {
            if !tokio::fs::metadata(&folder)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false)
            {
                return Err(SyncError::local_io(
                    &folder,
                    io::Error::new(io::ErrorKind::NotFound, "folder not found"),
                ));
            }
            for name in &names {
                let full = folder.join(name);
                if !tokio::fs::try_exists(&full).await.unwrap_or(false) {
                    return Err(SyncError::local_io(
                        &full,
                        io::Error::new(io::ErrorKind::NotFound, "file not found"),
                    ));
                }
            }

            let list_error = |e: anyhow::Error| SyncError::IgnoreList {
                path: folder.clone(),
                message: format!("{e:#}"),
            };
            let mut current = self.ignore.get(&folder).await.map_err(list_error)?;
            if ignore {
                current.extend(names);
            } else {
                current.retain(|name| !names.contains(name));
            }
            self.ignore.set(&folder, &current).await.map_err(list_error)?;
            info!(folder = %folder.display(), ignored = current.len(), "Ignore list updated");
        }
        Ok(())
    }
}
