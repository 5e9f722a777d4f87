//! Path resolution over the remote tree
//!
//! One walk ([`PathResolver::walk`]) consumes pattern segments from a start
//! node and returns the matched node chain plus the unconsumed remainder.
//! Existence checks look at the remainder being empty; auto-creation feeds
//! the remainder to [`PathResolver::resolve_or_create`].
//!
//! ## Matching
//!
//! - [`MatchMode::Exact`]: case-sensitive name equality
//! - [`MatchMode::Glob`]: shell wildcards (`*`, `?`, `[...]`) matched against
//!   the whole name of a single segment
//! - [`MatchMode::Regex`]: a regular expression that must match the whole name
//!
//! During a walk a wildcard segment is only consumed when it matches exactly
//! one child; zero or several matches end the walk.

use std::collections::VecDeque;

use glob::{MatchOptions, Pattern};
use regex::Regex;
use tracing::{debug, warn};

use mediatree_core::domain::{
    newtypes::RemotePath,
    node::{NodeKind, Privacy},
    pattern::{PathPattern, PatternSegment},
};

use crate::{tree::RemoteNode, SyncError};

/// How user-typed path segments are compared with remote names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    Exact,
    Glob,
    Regex,
}

// ============================================================================
// SegmentMatcher
// ============================================================================

/// Compiled form of one pattern segment
#[derive(Debug)]
pub enum SegmentMatcher {
    Exact(String),
    Glob(Pattern),
    Regex(Regex),
}

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl SegmentMatcher {
    /// Compiles `text` for `mode`
    ///
    /// # Errors
    /// Returns `SyncError::InvalidPattern` when the glob or regex is malformed
    pub fn compile(text: &str, mode: MatchMode) -> Result<Self, SyncError> {
        match mode {
            MatchMode::Exact => Ok(SegmentMatcher::Exact(text.to_string())),
            MatchMode::Glob => Pattern::new(text)
                .map(SegmentMatcher::Glob)
                .map_err(|e| SyncError::InvalidPattern {
                    pattern: text.to_string(),
                    message: e.to_string(),
                }),
            MatchMode::Regex => Regex::new(&format!("^(?:{text})$"))
                .map(SegmentMatcher::Regex)
                .map_err(|e| SyncError::InvalidPattern {
                    pattern: text.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// Full match of a single remote name
    pub fn matches(&self, name: &str) -> bool {
        match self {
            SegmentMatcher::Exact(expected) => expected == name,
            SegmentMatcher::Glob(pattern) => pattern.matches_with(name, GLOB_OPTIONS),
            SegmentMatcher::Regex(regex) => regex.is_match(name),
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Result of walking a pattern
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Nodes from the start node (usually the root) to the deepest match
    pub matched: Vec<RemoteNode>,
    /// Segments left unconsumed, starting with the first that did not match
    pub unmatched: Vec<PatternSegment>,
}

impl Resolution {
    /// Returns true when every segment matched
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }

    /// Deepest matched node
    ///
    /// `matched` always holds at least the start node.
    pub fn deepest(&self) -> &RemoteNode {
        &self.matched[self.matched.len() - 1]
    }

    /// Unmatched segment names joined below the deepest match
    pub fn requested_path(&self) -> String {
        let base = self.deepest().path().to_string();
        let rest = self
            .unmatched
            .iter()
            .map(PatternSegment::text)
            .collect::<Vec<_>>()
            .join("/");
        if rest.is_empty() {
            base
        } else {
            format!("{}/{rest}", base.trim_end_matches('/'))
        }
    }

    /// Error describing the first unmatched segment
    pub fn not_found(&self) -> SyncError {
        SyncError::NotFound {
            name: self
                .unmatched
                .first()
                .map(|segment| segment.text().to_string())
                .unwrap_or_default(),
            parent: self.deepest().path().to_string(),
        }
    }
}

// ============================================================================
// PathResolver
// ============================================================================

/// Maps path patterns onto remote nodes
#[derive(Debug, Clone)]
pub struct PathResolver {
    max_depth: usize,
}

impl PathResolver {
    /// Creates a resolver enforcing `max_depth` folder levels below the root
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolves `pattern` from `root`
    ///
    /// # Arguments
    /// * `root` - Root of the tree being addressed
    /// * `cwd` - Working directory for relative patterns, if it applies to this tree
    /// * `pattern` - Parsed path pattern
    /// * `mode` - How user-typed segments are matched
    pub async fn resolve(
        &self,
        root: RemoteNode,
        cwd: Option<&RemotePath>,
        pattern: &PathPattern,
        mode: MatchMode,
    ) -> Result<Resolution, SyncError> {
        self.walk(vec![root], pattern.anchored(cwd), mode).await
    }

    /// Consumes `segments` starting below the last node of `matched`
    ///
    /// `.` is a no-op and `..` pops the last matched node unless only the
    /// first one remains. The walk stops at the first segment without a
    /// unique match and returns it with everything after it.
    pub async fn walk(
        &self,
        mut matched: Vec<RemoteNode>,
        segments: Vec<PatternSegment>,
        mode: MatchMode,
    ) -> Result<Resolution, SyncError> {
        let mut pending: VecDeque<PatternSegment> = segments.into();

        while let Some(segment) = pending.front() {
            let Some(current) = matched.last() else {
                break;
            };
            match segment {
                PatternSegment::Current => {}
                PatternSegment::Parent => {
                    if matched.len() > 1 {
                        matched.pop();
                    }
                }
                PatternSegment::Literal(name) => match current.get_child(name).await? {
                    Some(child) => matched.push(child),
                    None => break,
                },
                PatternSegment::Name(text) => {
                    let found = match mode {
                        MatchMode::Exact => current.get_child(text).await?,
                        MatchMode::Glob | MatchMode::Regex => {
                            let matcher = SegmentMatcher::compile(text, mode)?;
                            let mut hits: Vec<RemoteNode> = current
                                .get_children(false)
                                .await?
                                .into_iter()
                                .filter(|child| matcher.matches(child.name()))
                                .collect();
                            if hits.len() > 1 {
                                debug!(
                                    segment = %text,
                                    parent = %current.path(),
                                    matches = hits.len(),
                                    "Ambiguous segment stops resolution"
                                );
                            }
                            if hits.len() == 1 {
                                hits.pop()
                            } else {
                                None
                            }
                        }
                    };
                    match found {
                        Some(child) => matched.push(child),
                        None => break,
                    }
                }
            }
            pending.pop_front();
        }

        Ok(Resolution {
            matched,
            unmatched: pending.into(),
        })
    }

    /// Number of hierarchy levels a creation would reach
    ///
    /// Counts the root and the leaf; an album leaf does not count as a level.
    pub fn levels(matched: usize, unmatched: usize, leaf_kind: NodeKind) -> usize {
        let levels = matched + unmatched;
        if leaf_kind == NodeKind::Album {
            levels.saturating_sub(1)
        } else {
            levels
        }
    }

    /// Creates the unmatched remainder of a resolution
    ///
    /// Every created segment but the last is a `Folder`; the last is
    /// `leaf_kind`. The depth check runs before any create call, so a
    /// too-deep request creates nothing.
    ///
    /// # Returns
    /// The full node chain from the start node to the leaf
    pub async fn resolve_or_create(
        &self,
        resolution: Resolution,
        leaf_kind: NodeKind,
        privacy: Privacy,
    ) -> Result<Vec<RemoteNode>, SyncError> {
        if resolution.is_complete() {
            return Ok(resolution.matched);
        }
        if let Some(segment) = resolution.unmatched.iter().find(|s| s.is_navigation()) {
            return Err(SyncError::InvalidPattern {
                pattern: resolution.requested_path(),
                message: format!("cannot create a node named \"{segment}\""),
            });
        }

        let levels = Self::levels(
            resolution.matched.len(),
            resolution.unmatched.len(),
            leaf_kind,
        );
        if levels > self.max_depth + 1 {
            return Err(SyncError::DepthLimit {
                path: resolution.requested_path(),
                max_levels: self.max_depth,
            });
        }

        let Resolution {
            mut matched,
            unmatched,
        } = resolution;
        let last = unmatched.len() - 1;
        for (i, segment) in unmatched.iter().enumerate() {
            let kind = if i == last { leaf_kind } else { NodeKind::Folder };
            let parent = &matched[matched.len() - 1];
            let child = parent.get_or_create_child(segment.text(), kind, privacy).await?;
            matched.push(child);
        }
        Ok(matched)
    }

    /// Resolves a pattern that may designate several nodes
    ///
    /// A single unmatched trailing segment is applied as a wildcard to the
    /// deepest match's children. A fully matched container yields its
    /// children unless `directories_only` is set.
    pub async fn resolve_multiple(
        &self,
        root: RemoteNode,
        cwd: Option<&RemotePath>,
        pattern: &PathPattern,
        mode: MatchMode,
        directories_only: bool,
    ) -> Result<Vec<RemoteNode>, SyncError> {
        let resolution = self.resolve(root, cwd, pattern, mode).await?;

        if !resolution.is_complete() {
            if resolution.unmatched.len() > 1 {
                warn!("{}", resolution.not_found());
                return Ok(Vec::new());
            }
            let segment = resolution.unmatched[0].text();
            let wildcard = if mode == MatchMode::Regex {
                MatchMode::Regex
            } else {
                MatchMode::Glob
            };
            let matcher = SegmentMatcher::compile(segment, wildcard)?;
            let hits: Vec<RemoteNode> = resolution
                .deepest()
                .get_children(false)
                .await?
                .into_iter()
                .filter(|child| matcher.matches(child.name()))
                .collect();
            if hits.is_empty() {
                warn!("{}", resolution.not_found());
            }
            return Ok(hits);
        }

        let node = resolution.deepest().clone();
        if !node.is_container() || directories_only {
            Ok(vec![node])
        } else {
            node.get_children(false).await
        }
    }

    /// Expands a pattern where every segment may match many nodes
    ///
    /// `..` is applied lexically to the anchored pattern before expansion.
    pub async fn expand(
        &self,
        root: RemoteNode,
        cwd: Option<&RemotePath>,
        pattern: &PathPattern,
        mode: MatchMode,
    ) -> Result<Vec<RemoteNode>, SyncError> {
        let mut segments: Vec<PatternSegment> = Vec::new();
        for segment in pattern.anchored(cwd) {
            match segment {
                PatternSegment::Current => {}
                PatternSegment::Parent => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }

        let mut worklist = vec![root];
        for segment in &segments {
            let matcher = match segment {
                PatternSegment::Literal(name) => SegmentMatcher::Exact(name.clone()),
                other if mode == MatchMode::Regex => {
                    SegmentMatcher::compile(other.text(), MatchMode::Regex)?
                }
                other => SegmentMatcher::compile(other.text(), MatchMode::Glob)?,
            };
            let mut next = Vec::new();
            for node in &worklist {
                next.extend(
                    node.get_children(false)
                        .await?
                        .into_iter()
                        .filter(|child| matcher.matches(child.name())),
                );
            }
            worklist = next;
            if worklist.is_empty() {
                break;
            }
        }
        Ok(worklist)
    }
}
