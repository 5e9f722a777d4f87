//! Local-to-remote sync run
//!
//! A run moves through `Confirming -> Running -> {Completed, Aborted}`:
//!
//! 1. **Preflight**: expand local sources, resolve the (existing) remote
//!    target and reject incompatible source/target combinations. Any
//!    failure here aborts the run before a pool starts.
//! 2. **Confirming**: preview sources and target and ask the
//!    [`IConfirmPrompt`] unless `force` is set. Declining returns a
//!    [`SyncStatus::Declined`] report without side effects.
//! 3. **Running**: three [`WorkerPool`]s form a pipeline:
//!    - folder tasks resolve or create the album for one local directory
//!      and fan out one file task per media file
//!    - file tasks run the [`ChangeDetector`] and enqueue uploads
//!    - upload tasks delete stale remote copies and transfer the bytes
//!
//! Directories and, within a directory, files are submitted in sorted
//! order. Errors are caught at the task boundary, recorded in the report
//! and never stop sibling tasks.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Component, Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Instant,
};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use mediatree_core::{
    config::{Config, SyncConfig},
    domain::{
        node::{NodeKind, Privacy},
        pattern::{PathPattern, PatternSegment},
    },
    ports::{
        ignore_store::IIgnoreStore, media_probe::IMediaProbe, prompt::IConfirmPrompt,
        remote_client::UploadProgress,
    },
};

use crate::{
    decision::{extension_of, ChangeDetector, Decision, LocalFile},
    local::{self, WalkStep},
    pool::{PoolHandle, PoolSummary, WorkerPool},
    progress::{Lane, TaskProgressTracker},
    resolver::{MatchMode, PathResolver},
    tree::{RemoteNode, RemoteTree},
    SyncError,
};

/// Album name prefix for media found next to subfolders
pub const LOOSE_FILES_ALBUM_PREFIX: &str = "Images from folder ";

// ============================================================================
// Request / report
// ============================================================================

/// Parameters of one sync run
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// Remote user; the authenticated user when `None`
    pub user: Option<String>,
    /// Local paths or glob patterns; a trailing `/` syncs a folder's contents
    pub sources: Vec<String>,
    /// Existing remote folder or album
    pub target: String,
    /// Skip the confirmation prompt
    pub force: bool,
    /// Privacy of created nodes; the configured default when `None`
    pub privacy: Option<Privacy>,
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// The user declined the confirmation prompt
    Declined,
    Completed,
    /// The cancellation token fired during the run
    Aborted,
}

/// Summary of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    /// Local directories whose album was found or created
    pub folders_synced: u32,
    /// Media files compared against the remote album
    pub files_checked: u32,
    /// Files whose remote copy was current
    pub files_skipped: u32,
    /// Files uploaded for the first time
    pub files_uploaded: u32,
    /// Stale remote files deleted and uploaded again
    pub files_replaced: u32,
    /// Per-task failures (non-fatal)
    pub errors: Vec<String>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl SyncReport {
    fn declined(started: Instant) -> Self {
        Self {
            status: SyncStatus::Declined,
            folders_synced: 0,
            files_checked: 0,
            files_skipped: 0,
            files_uploaded: 0,
            files_replaced: 0,
            errors: Vec::new(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

// ============================================================================
// Sources
// ============================================================================

/// One local source of a run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SyncSource {
    /// Directory to walk, or the parent directory of loose files
    pub root: PathBuf,
    /// Sync the directory's contents instead of the directory itself
    pub contents_only: bool,
    /// Loose files of `root` given individually; `None` for a directory walk
    pub files: Option<Vec<String>>,
}

impl SyncSource {
    /// Local directory that maps onto the remote target
    fn base(&self) -> &Path {
        if self.contents_only {
            &self.root
        } else {
            self.root.parent().unwrap_or_else(|| Path::new(""))
        }
    }

    pub fn is_directory(&self) -> bool {
        self.files.is_none()
    }

    /// Paths shown in the confirmation preview
    fn preview(&self) -> Vec<String> {
        match &self.files {
            Some(files) => files
                .iter()
                .map(|name| self.root.join(name).display().to_string())
                .collect(),
            None => vec![self.to_string()],
        }
    }
}

impl fmt::Display for SyncSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contents_only {
            write!(f, "{}/", self.root.display())
        } else {
            write!(f, "{}", self.root.display())
        }
    }
}

/// Expands source patterns against the local filesystem
///
/// Directories become one source each. Files are grouped by their parent
/// directory into a single contents-only source per parent. Patterns that
/// match nothing are collected into one `SourcesNotFound` error.
pub async fn expand_sources(patterns: &[String]) -> Result<Vec<SyncSource>, SyncError> {
    let mut sources = Vec::new();
    let mut files_by_dir: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
    let mut missing = Vec::new();

    for pattern in patterns {
        let contents_only = pattern.len() > 1 && pattern.ends_with('/');
        let trimmed = if contents_only {
            pattern.trim_end_matches('/')
        } else {
            pattern.as_str()
        };
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };

        let matches: Vec<PathBuf> = glob::glob(trimmed)
            .map_err(|e| SyncError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?
            .filter_map(Result::ok)
            .collect();
        if matches.is_empty() {
            missing.push(pattern.clone());
            continue;
        }

        for path in matches {
            let meta = tokio::fs::metadata(&path)
                .await
                .map_err(|e| SyncError::local_io(&path, e))?;
            if meta.is_dir() {
                sources.push(SyncSource {
                    root: path,
                    contents_only,
                    files: None,
                });
            } else if meta.is_file() {
                let parent = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                if let Some(name) = path.file_name() {
                    files_by_dir
                        .entry(parent)
                        .or_default()
                        .push(name.to_string_lossy().into_owned());
                }
            }
        }
    }

    if !missing.is_empty() {
        return Err(SyncError::SourcesNotFound(missing));
    }

    sources.extend(files_by_dir.into_iter().map(|(root, mut files)| {
        files.sort();
        files.dedup();
        SyncSource {
            root,
            contents_only: true,
            files: Some(files),
        }
    }));
    sources.sort();
    Ok(sources)
}

/// Remote folder names (below the root) for one local walk step
///
/// The step's path relative to the source base is appended to `target`.
/// A directory holding both files and subfolders gets its files placed in
/// an extra `Images from folder <name>` album.
pub fn album_segments(target: &[String], source: &SyncSource, step: &WalkStep) -> Vec<String> {
    let mut segments = target.to_vec();
    let relative = step
        .dir
        .strip_prefix(source.base())
        .unwrap_or_else(|_| Path::new(""));
    for component in relative.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_string_lossy().trim().to_string()),
            Component::ParentDir => {
                segments.pop();
            }
            _ => {}
        }
    }
    if !step.subdirs.is_empty() {
        let last = segments.last().cloned().unwrap_or_default();
        segments.push(format!("{LOOSE_FILES_ALBUM_PREFIX}{last}"));
    }
    segments
}

/// Longest prefix of `chain` (a root-first node chain) matching `segments`
///
/// # Returns
/// The reusable nodes (always including the root) and the segments left
/// to resolve below them
pub fn common_prefix(chain: &[RemoteNode], segments: &[String]) -> (Vec<RemoteNode>, Vec<String>) {
    let shared = chain
        .iter()
        .skip(1)
        .zip(segments)
        .take_while(|(node, name)| node.name() == name.as_str())
        .count();
    let keep = (shared + 1).min(chain.len());
    (chain[..keep].to_vec(), segments[shared..].to_vec())
}

// ============================================================================
// Run state shared by all tasks
// ============================================================================

#[derive(Debug, Default)]
struct RunStats {
    folders: AtomicU32,
    checked: AtomicU32,
    skipped: AtomicU32,
    uploaded: AtomicU32,
    replaced: AtomicU32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct RunContext {
    resolver: PathResolver,
    detector: ChangeDetector,
    config: SyncConfig,
    tracker: Arc<TaskProgressTracker>,
    cancel: CancellationToken,
    privacy: Privacy,
    /// Path of the remote target below the root
    target_segments: Vec<String>,
    /// Most recently resolved album chain, reused as a lookup prefix
    last_chain: Mutex<Arc<Vec<RemoteNode>>>,
    /// Local directories whose album could not be resolved
    failed_dirs: Mutex<Vec<PathBuf>>,
    errors: Mutex<Vec<String>>,
    stats: RunStats,
}

impl RunContext {
    fn is_media(&self, name: &str) -> bool {
        extension_of(name.trim()).is_some_and(|ext| self.config.is_media_extension(ext))
    }

    fn record_error(&self, message: String) {
        warn!("{message}");
        self.tracker.println(&message);
        lock(&self.errors).push(message);
    }

    fn in_failed_subtree(&self, dir: &Path) -> bool {
        lock(&self.failed_dirs)
            .iter()
            .any(|failed| dir.starts_with(failed))
    }

    /// Finds or creates the album for `segments`
    async fn resolve_album(&self, segments: Vec<String>) -> Result<RemoteNode, SyncError> {
        let previous = Arc::clone(&lock(&self.last_chain));
        let (prefix, rest) = common_prefix(&previous, &segments);
        let resolution = self
            .resolver
            .walk(
                prefix,
                rest.into_iter().map(PatternSegment::Literal).collect(),
                MatchMode::Exact,
            )
            .await?;

        let chain = if resolution.is_complete() {
            info!(path = %resolution.deepest().path(), "Found matching remote album");
            resolution.matched
        } else {
            self.resolver
                .resolve_or_create(resolution, NodeKind::Album, self.privacy)
                .await?
        };

        let album = chain
            .last()
            .cloned()
            .ok_or_else(|| SyncError::InvalidTarget("empty node chain".to_string()))?;
        if album.kind() != NodeKind::Album {
            return Err(SyncError::InvalidTarget(format!(
                "\"{}\" is a {}, not an album",
                album.path(),
                album.kind()
            )));
        }
        *lock(&self.last_chain) = Arc::new(chain);
        Ok(album)
    }

    fn report(&self, status: SyncStatus, started: Instant) -> SyncReport {
        SyncReport {
            status,
            folders_synced: self.stats.folders.load(Ordering::Relaxed),
            files_checked: self.stats.checked.load(Ordering::Relaxed),
            files_skipped: self.stats.skipped.load(Ordering::Relaxed),
            files_uploaded: self.stats.uploaded.load(Ordering::Relaxed),
            files_replaced: self.stats.replaced.load(Ordering::Relaxed),
            errors: lock(&self.errors).clone(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Work handed from a file task to an upload task
struct UploadPlan {
    local: LocalFile,
    album: RemoteNode,
    /// Remote copy to delete first when replacing
    stale: Option<RemoteNode>,
}

// ============================================================================
// Tasks
// ============================================================================

async fn sync_folder(
    ctx: Arc<RunContext>,
    source: Arc<SyncSource>,
    step: WalkStep,
    files: PoolHandle,
    uploads: PoolHandle,
) {
    if ctx.cancel.is_cancelled() {
        return;
    }
    if ctx.in_failed_subtree(&step.dir) {
        debug!(dir = %step.dir.display(), "Parent folder failed, skipping");
        return;
    }

    let media: Vec<&String> = step.files.iter().filter(|name| ctx.is_media(name)).collect();
    if media.is_empty() {
        return;
    }

    let _task = ctx.tracker.start_task(
        Lane::Folder,
        format!("* Syncing folder \"{}\"...", step.dir.display()),
    );
    let segments = album_segments(&ctx.target_segments, &source, &step);
    let album = match ctx.resolve_album(segments).await {
        Ok(album) => album,
        Err(e) => {
            lock(&ctx.failed_dirs).push(step.dir.clone());
            ctx.record_error(format!("Folder \"{}\": {e}", step.dir.display()));
            return;
        }
    };
    ctx.stats.folders.fetch_add(1, Ordering::Relaxed);

    for name in media {
        if ctx.cancel.is_cancelled() {
            return;
        }
        files.submit(sync_file(
            Arc::clone(&ctx),
            step.dir.join(name),
            album.clone(),
            uploads.clone(),
        ));
    }
}

async fn sync_file(ctx: Arc<RunContext>, path: PathBuf, album: RemoteNode, uploads: PoolHandle) {
    if ctx.cancel.is_cancelled() {
        return;
    }
    let _task = ctx
        .tracker
        .start_task(Lane::File, format!("* Syncing file \"{}\"...", path.display()));

    match check_file(&ctx, &path, album).await {
        Ok(Some(plan)) => {
            if !ctx.cancel.is_cancelled() {
                uploads.submit(upload_file(Arc::clone(&ctx), plan));
            }
        }
        Ok(None) => {}
        Err(e) => ctx.record_error(format!("File \"{}\": {e}", path.display())),
    }
}

async fn check_file(
    ctx: &RunContext,
    path: &Path,
    album: RemoteNode,
) -> Result<Option<UploadPlan>, SyncError> {
    let local = LocalFile::read(path).await?;
    ctx.stats.checked.fetch_add(1, Ordering::Relaxed);

    let remote_name = ctx.detector.remote_name_for(&local.name);
    let remote = album.get_child(&remote_name).await?;
    let decision = ctx
        .detector
        .decide(&local, remote.as_ref().and_then(RemoteNode::file));

    match decision {
        Decision::Skip => {
            ctx.stats.skipped.fetch_add(1, Ordering::Relaxed);
            debug!(file = %path.display(), "Remote copy is current");
            Ok(None)
        }
        Decision::UploadNew => Ok(Some(UploadPlan {
            local,
            album,
            stale: None,
        })),
        Decision::ReplaceAndUpload => Ok(Some(UploadPlan {
            local,
            album,
            stale: remote,
        })),
    }
}

async fn upload_file(ctx: Arc<RunContext>, plan: UploadPlan) {
    if ctx.cancel.is_cancelled() {
        return;
    }
    let path = plan.local.path.display().to_string();

    if let Some(stale) = &plan.stale {
        info!(file = %path, "File exists but has changed, deleting old version");
        if let Err(e) = stale.delete().await {
            ctx.record_error(format!("File \"{path}\": {e}"));
            return;
        }
        plan.album.invalidate_cache();
    }

    let label = if plan.stale.is_some() {
        format!("+ Re-uploading \"{path}\"")
    } else {
        format!("+ Uploading \"{path}\"")
    };
    let task = ctx.tracker.start_task(Lane::Upload, label.clone());
    let progress: UploadProgress = {
        let tracker = Arc::clone(&ctx.tracker);
        let cancel = ctx.cancel.clone();
        Box::new(move |percent: u8| {
            tracker.update_progress(Lane::Upload, &label, &format!(": {percent}%"));
            cancel.is_cancelled()
        })
    };
    let result = plan
        .album
        .upload(&plan.local.name, &plan.local.content, progress)
        .await;
    drop(task);
    plan.album.invalidate_cache();

    match result {
        Ok(_) if plan.stale.is_some() => {
            ctx.stats.replaced.fetch_add(1, Ordering::Relaxed);
            info!(file = %path, "Re-uploaded");
            ctx.tracker.println(format!("Re-uploaded \"{path}\"."));
        }
        Ok(_) => {
            ctx.stats.uploaded.fetch_add(1, Ordering::Relaxed);
            info!(file = %path, "Uploaded");
            ctx.tracker.println(format!("Uploaded \"{path}\"."));
        }
        Err(e) => ctx.record_error(format!("File \"{path}\": {e}")),
    }
}

// ============================================================================
// SyncPipeline
// ============================================================================

/// Mirrors local directories into the remote tree
///
/// ## Dependencies
///
/// - `tree`: Remote tree cache shared with other operations
/// - `ignore`: Per-folder ignore lists applied while walking
/// - `prompt`: Confirmation before a run starts
/// - `probe`: Media timestamps for video comparisons
pub struct SyncPipeline {
    tree: Arc<RemoteTree>,
    resolver: PathResolver,
    detector: ChangeDetector,
    config: SyncConfig,
    ignore: Arc<dyn IIgnoreStore>,
    prompt: Arc<dyn IConfirmPrompt>,
    tracker: Arc<TaskProgressTracker>,
    cancel: CancellationToken,
}

impl SyncPipeline {
    /// Creates a pipeline drawing progress to stderr
    ///
    /// # Arguments
    /// * `tree` - Remote tree to sync into
    /// * `config` - Worker counts, media formats and depth limit
    /// * `probe` - Media timestamp extraction (IMediaProbe)
    /// * `ignore` - Ignore-list storage (IIgnoreStore)
    /// * `prompt` - Confirmation prompt (IConfirmPrompt)
    pub fn new(
        tree: Arc<RemoteTree>,
        config: &Config,
        probe: Arc<dyn IMediaProbe>,
        ignore: Arc<dyn IIgnoreStore>,
        prompt: Arc<dyn IConfirmPrompt>,
    ) -> Self {
        Self {
            tree,
            resolver: PathResolver::new(config.remote.max_depth),
            detector: ChangeDetector::new(&config.sync, probe),
            config: config.sync.clone(),
            ignore,
            prompt,
            tracker: Arc::new(TaskProgressTracker::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the progress tracker
    #[must_use]
    pub fn with_progress(mut self, tracker: Arc<TaskProgressTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Replaces the cancellation token
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts the run when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn progress(&self) -> &Arc<TaskProgressTracker> {
        &self.tracker
    }

    /// Remote tree this pipeline syncs into
    pub fn tree(&self) -> &Arc<RemoteTree> {
        &self.tree
    }

    /// Runs one sync
    ///
    /// # Returns
    /// A [`SyncReport`]; per-file and per-folder failures are listed in
    /// `errors` rather than returned
    ///
    /// # Errors
    /// Fails before any remote change when a source is missing, the target
    /// does not exist, or the sources cannot go into the target
    #[instrument(skip_all, fields(target = %request.target, sources = request.sources.len()))]
    pub async fn run(&self, request: SyncRequest) -> Result<SyncReport, SyncError> {
        let started = Instant::now();
        let sources = expand_sources(&request.sources).await?;

        let user = match request.user {
            Some(user) => user,
            None => self
                .tree
                .client()
                .authenticated_user()
                .await
                .map_err(|e| SyncError::remote("fetch authenticated user", e))?,
        };
        let root = self.tree.root(&user).await?;

        let target_text = if request.target.starts_with('/') {
            request.target.clone()
        } else {
            format!("/{}", request.target)
        };
        let resolution = self
            .resolver
            .resolve(root, None, &PathPattern::parse(&target_text), MatchMode::Exact)
            .await?;
        if !resolution.is_complete() {
            return Err(resolution.not_found());
        }
        let target = resolution.deepest().clone();

        match target.kind() {
            NodeKind::Root | NodeKind::Folder => {
                if sources.iter().any(|s| !s.is_directory()) {
                    return Err(SyncError::InvalidTarget(
                        "files cannot be uploaded to a folder, sync them to an album".to_string(),
                    ));
                }
            }
            NodeKind::Album => {
                if sources.iter().any(|s| s.is_directory() && !s.contents_only) {
                    return Err(SyncError::InvalidTarget(
                        "folders cannot be uploaded to an album, sync them to a folder"
                            .to_string(),
                    ));
                }
            }
            NodeKind::File => {
                return Err(SyncError::InvalidTarget(format!(
                    "\"{}\" is a file",
                    target.path()
                )));
            }
        }

        if !request.force {
            let question = Self::confirmation(&sources, target.kind(), &target_text);
            if !self.prompt.confirm(&question).await {
                info!("Sync declined");
                return Ok(SyncReport::declined(started));
            }
        }

        self.tree
            .set_max_cached_nodes(Some(self.config.children_cache_limit()));
        info!(user = %user, "Starting sync run");
        let ctx = Arc::new(RunContext {
            resolver: self.resolver.clone(),
            detector: self.detector.clone(),
            config: self.config.clone(),
            tracker: Arc::clone(&self.tracker),
            cancel: self.cancel.clone(),
            privacy: request.privacy.unwrap_or(self.config.default_privacy),
            target_segments: target.path().segments().to_vec(),
            last_chain: Mutex::new(Arc::new(resolution.matched)),
            failed_dirs: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            stats: RunStats::default(),
        });

        let upload_pool = WorkerPool::new("upload", self.config.upload_workers, self.cancel.clone());
        let file_pool = WorkerPool::new("file", self.config.file_workers, self.cancel.clone());
        let folder_pool = WorkerPool::new("folder", self.config.folder_workers, self.cancel.clone());

        if let (Some(folders), Some(files), Some(uploads)) =
            (folder_pool.handle(), file_pool.handle(), upload_pool.handle())
        {
            self.submit_sources(&ctx, sources, &folders, &files, &uploads)
                .await;
        }

        let summaries = [
            ("folder", folder_pool.drain().await),
            ("file", file_pool.drain().await),
            ("upload", upload_pool.drain().await),
        ];
        for (pool, summary) in summaries {
            Self::record_panics(&ctx, pool, summary);
        }
        self.tracker.finish();

        let status = if self.cancel.is_cancelled() {
            SyncStatus::Aborted
        } else {
            SyncStatus::Completed
        };
        let report = ctx.report(status, started);
        info!(
            status = ?report.status,
            folders = report.folders_synced,
            checked = report.files_checked,
            skipped = report.files_skipped,
            uploaded = report.files_uploaded,
            replaced = report.files_replaced,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "Sync run finished"
        );
        Ok(report)
    }

    /// Walks every source and submits its folder tasks in sorted order
    async fn submit_sources(
        &self,
        ctx: &Arc<RunContext>,
        sources: Vec<SyncSource>,
        folders: &PoolHandle,
        files: &PoolHandle,
        uploads: &PoolHandle,
    ) {
        for source in sources {
            if self.cancel.is_cancelled() {
                return;
            }
            let steps = match &source.files {
                Some(names) => {
                    let ignored = match self.ignore.get(&source.root).await {
                        Ok(ignored) => ignored,
                        Err(e) => {
                            ctx.record_error(format!(
                                "Ignore list for \"{}\": {e:#}",
                                source.root.display()
                            ));
                            continue;
                        }
                    };
                    let kept = names
                        .iter()
                        .filter(|name| !ignored.contains(*name))
                        .cloned()
                        .collect();
                    vec![WalkStep::files_only(&source.root, kept)]
                }
                None => match local::walk(&source.root, self.ignore.as_ref(), &self.cancel).await {
                    Ok(walk) => {
                        for failure in walk.failures {
                            ctx.record_error(format!("Source \"{source}\": {failure}"));
                        }
                        walk.steps
                    }
                    Err(e) => {
                        ctx.record_error(format!("Source \"{source}\": {e}"));
                        continue;
                    }
                },
            };

            let source = Arc::new(source);
            for step in steps {
                if self.cancel.is_cancelled() {
                    return;
                }
                folders.submit(sync_folder(
                    Arc::clone(ctx),
                    Arc::clone(&source),
                    step,
                    files.clone(),
                    uploads.clone(),
                ));
            }
        }
    }

    fn confirmation(sources: &[SyncSource], kind: NodeKind, target: &str) -> String {
        let listed: Vec<String> = sources.iter().flat_map(SyncSource::preview).collect();
        let what = match listed.as_slice() {
            [single] => format!("\"{single}\""),
            many => format!("\n  {}\n", many.join("\n  ")),
        };
        format!("Syncing {what} to remote {kind} \"{target}\".\nProceed (yes/no)?")
    }

    fn record_panics(ctx: &RunContext, pool: &str, summary: PoolSummary) {
        if summary.panicked > 0 {
            ctx.record_error(format!("{} {pool} task(s) panicked", summary.panicked));
        }
        if summary.discarded > 0 {
            debug!(pool, discarded = summary.discarded, "Queued tasks dropped after abort");
        }
    }
}
