//! Integration tests for path resolution and auto-creation

use mediatree_core::domain::{
    newtypes::RemotePath,
    node::{NodeKind, Privacy},
    pattern::PathPattern,
};
use mediatree_sync::{MatchMode, PathResolver, SyncError};

use crate::common::{self, FakeRemote, ME};

fn sample_remote() -> std::sync::Arc<FakeRemote> {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trips", NodeKind::Folder);
    remote.add_container("/Trips", "2022", NodeKind::Folder);
    remote.add_container("/Trips", "2023", NodeKind::Folder);
    remote.add_container("/Trips/2023", "Rome", NodeKind::Album);
    remote.add_container("/Trips/2023", "Paris", NodeKind::Album);
    remote.add_file("/Trips/2023/Rome", "IMG_0001.jpg", b"one");
    remote.add_file("/Trips/2023/Rome", "IMG_0002.jpg", b"two");
    remote.add_file("/Trips/2023/Rome", "clip.mp4", b"three");
    remote
}

fn paths(nodes: &[mediatree_sync::RemoteNode]) -> Vec<String> {
    nodes.iter().map(|node| node.path().to_string()).collect()
}

// ============================================================================
// resolve
// ============================================================================

#[tokio::test]
async fn test_exact_resolution_matches_repeated_get_child() {
    let remote = sample_remote();
    let tree = common::tree(&remote);
    let root = tree.root(ME).await.unwrap();
    let resolver = PathResolver::new(5);

    let resolution = resolver
        .resolve(
            root.clone(),
            None,
            &PathPattern::parse("/Trips/2023/Rome"),
            MatchMode::Exact,
        )
        .await
        .unwrap();

    let manual = root
        .get_child("Trips")
        .await
        .unwrap()
        .unwrap()
        .get_child("2023")
        .await
        .unwrap()
        .unwrap()
        .get_child("Rome")
        .await
        .unwrap()
        .unwrap();

    assert!(resolution.is_complete());
    assert_eq!(resolution.matched.len(), 4);
    assert_eq!(resolution.deepest().id(), manual.id());
}

#[tokio::test]
async fn test_parent_segments_pop_and_stop_at_root() {
    let remote = sample_remote();
    let root = common::tree(&remote).root(ME).await.unwrap();
    let resolver = PathResolver::new(5);

    let up = resolver
        .resolve(
            root.clone(),
            None,
            &PathPattern::parse("/Trips/2023/.."),
            MatchMode::Exact,
        )
        .await
        .unwrap();
    assert_eq!(up.deepest().path().to_string(), "/Trips");

    let beyond = resolver
        .resolve(
            root,
            None,
            &PathPattern::parse("/../../Trips/./2022"),
            MatchMode::Exact,
        )
        .await
        .unwrap();
    assert!(beyond.is_complete());
    assert_eq!(beyond.deepest().path().to_string(), "/Trips/2022");
}

#[tokio::test]
async fn test_missing_segment_is_reported_with_remainder() {
    let remote = sample_remote();
    let root = common::tree(&remote).root(ME).await.unwrap();
    let resolver = PathResolver::new(5);

    let resolution = resolver
        .resolve(
            root,
            None,
            &PathPattern::parse("/Trips/2024/Oslo"),
            MatchMode::Exact,
        )
        .await
        .unwrap();

    assert!(!resolution.is_complete());
    assert_eq!(resolution.deepest().path().to_string(), "/Trips");
    assert_eq!(resolution.requested_path(), "/Trips/2024/Oslo");
    match resolution.not_found() {
        SyncError::NotFound { name, parent } => {
            assert_eq!(name, "2024");
            assert_eq!(parent, "/Trips");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unique_glob_is_consumed_and_ambiguous_glob_stops() {
    let remote = sample_remote();
    let root = common::tree(&remote).root(ME).await.unwrap();
    let resolver = PathResolver::new(5);

    let unique = resolver
        .resolve(
            root.clone(),
            None,
            &PathPattern::parse("/Tr*/2023/R?me"),
            MatchMode::Glob,
        )
        .await
        .unwrap();
    assert!(unique.is_complete());
    assert_eq!(unique.deepest().path().to_string(), "/Trips/2023/Rome");

    let ambiguous = resolver
        .resolve(
            root,
            None,
            &PathPattern::parse("/Trips/20*/Rome"),
            MatchMode::Glob,
        )
        .await
        .unwrap();
    assert_eq!(ambiguous.deepest().path().to_string(), "/Trips");
    assert_eq!(ambiguous.unmatched.len(), 2);
}

#[tokio::test]
async fn test_regex_must_match_whole_name() {
    let remote = sample_remote();
    let root = common::tree(&remote).root(ME).await.unwrap();
    let resolver = PathResolver::new(5);

    let partial = resolver
        .resolve(
            root.clone(),
            None,
            &PathPattern::parse("/Trip"),
            MatchMode::Regex,
        )
        .await
        .unwrap();
    assert!(!partial.is_complete());

    let full = resolver
        .resolve(
            root,
            None,
            &PathPattern::parse("/Trip.*/202[3]"),
            MatchMode::Regex,
        )
        .await
        .unwrap();
    assert_eq!(full.deepest().path().to_string(), "/Trips/2023");
}

#[tokio::test]
async fn test_invalid_regex_is_an_error() {
    let remote = sample_remote();
    let root = common::tree(&remote).root(ME).await.unwrap();

    let err = PathResolver::new(5)
        .resolve(root, None, &PathPattern::parse("/Trips/(2023"), MatchMode::Regex)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidPattern { .. }));
}

#[tokio::test]
async fn test_relative_pattern_is_anchored_at_cwd() {
    let remote = sample_remote();
    let root = common::tree(&remote).root(ME).await.unwrap();
    let cwd: RemotePath = "/Trips/2023".parse().unwrap();

    let resolution = PathResolver::new(5)
        .resolve(
            root,
            Some(&cwd),
            &PathPattern::parse("../2022"),
            MatchMode::Exact,
        )
        .await
        .unwrap();

    assert!(resolution.is_complete());
    assert_eq!(resolution.deepest().path().to_string(), "/Trips/2022");
}

// ============================================================================
// resolve_or_create
// ============================================================================

#[tokio::test]
async fn test_resolve_or_create_is_idempotent() {
    let remote = sample_remote();
    let tree = common::tree(&remote);
    let resolver = PathResolver::new(5);
    let pattern = PathPattern::parse("/Trips/2024/Oslo");

    for _ in 0..2 {
        let root = tree.root(ME).await.unwrap();
        let resolution = resolver
            .resolve(root, None, &pattern, MatchMode::Exact)
            .await
            .unwrap();
        let chain = resolver
            .resolve_or_create(resolution, NodeKind::Album, Privacy::Public)
            .await
            .unwrap();
        assert_eq!(
            paths(&chain),
            vec!["/", "/Trips", "/Trips/2024", "/Trips/2024/Oslo"]
        );
        assert_eq!(chain[2].kind(), NodeKind::Folder);
        assert_eq!(chain[3].kind(), NodeKind::Album);
    }

    assert_eq!(FakeRemote::count(&remote.calls.creates), 2);
    assert_eq!(remote.names("/Trips"), vec!["2022", "2023", "2024"]);
}

#[tokio::test]
async fn test_depth_limit_counts_folders_but_not_album_leaf() {
    let remote = FakeRemote::new();
    let tree = common::tree(&remote);
    let resolver = PathResolver::new(5);

    let create = |path: &'static str, kind: NodeKind| {
        let tree = tree.clone();
        let resolver = resolver.clone();
        async move {
            let root = tree.root(ME).await.unwrap();
            let resolution = resolver
                .resolve(root, None, &PathPattern::parse(path), MatchMode::Exact)
                .await
                .unwrap();
            resolver
                .resolve_or_create(resolution, kind, Privacy::Public)
                .await
        }
    };

    create("/a/b/c/d/e", NodeKind::Folder).await.unwrap();
    create("/a/b/c/d/e/album", NodeKind::Album).await.unwrap();
    let creates = FakeRemote::count(&remote.calls.creates);
    assert_eq!(creates, 6);

    let err = create("/a/b/c/d/e/f", NodeKind::Folder).await.unwrap_err();
    match err {
        SyncError::DepthLimit { path, max_levels } => {
            assert_eq!(path, "/a/b/c/d/e/f");
            assert_eq!(max_levels, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = create("/x/y/z/u/v/w/album", NodeKind::Album).await.unwrap_err();
    assert!(matches!(err, SyncError::DepthLimit { .. }));
    assert_eq!(FakeRemote::count(&remote.calls.creates), creates);
}

#[tokio::test]
async fn test_navigation_segments_are_never_created() {
    let remote = FakeRemote::new();
    let root = common::tree(&remote).root(ME).await.unwrap();
    let resolver = PathResolver::new(5);

    let resolution = resolver
        .resolve(root, None, &PathPattern::parse("/new/.."), MatchMode::Exact)
        .await
        .unwrap();
    let err = resolver
        .resolve_or_create(resolution, NodeKind::Folder, Privacy::Public)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidPattern { .. }));
    assert_eq!(FakeRemote::count(&remote.calls.creates), 0);
}

// ============================================================================
// resolve_multiple and expand
// ============================================================================

#[tokio::test]
async fn test_resolve_multiple_lists_container_children() {
    let remote = sample_remote();
    let root = common::tree(&remote).root(ME).await.unwrap();
    let resolver = PathResolver::new(5);
    let pattern = PathPattern::parse("/Trips/2023");

    let children = resolver
        .resolve_multiple(root.clone(), None, &pattern, MatchMode::Exact, false)
        .await
        .unwrap();
    assert_eq!(paths(&children), vec!["/Trips/2023/Rome", "/Trips/2023/Paris"]);

    let itself = resolver
        .resolve_multiple(root, None, &pattern, MatchMode::Exact, true)
        .await
        .unwrap();
    assert_eq!(paths(&itself), vec!["/Trips/2023"]);
}

#[tokio::test]
async fn test_resolve_multiple_applies_trailing_wildcard() {
    let remote = sample_remote();
    let root = common::tree(&remote).root(ME).await.unwrap();
    let resolver = PathResolver::new(5);

    let images = resolver
        .resolve_multiple(
            root.clone(),
            None,
            &PathPattern::parse("/Trips/2023/Rome/*.jpg"),
            MatchMode::Exact,
            false,
        )
        .await
        .unwrap();
    assert_eq!(
        paths(&images),
        vec!["/Trips/2023/Rome/IMG_0001.jpg", "/Trips/2023/Rome/IMG_0002.jpg"]
    );

    let file = resolver
        .resolve_multiple(
            root.clone(),
            None,
            &PathPattern::parse("/Trips/2023/Rome/clip.mp4"),
            MatchMode::Exact,
            false,
        )
        .await
        .unwrap();
    assert_eq!(paths(&file), vec!["/Trips/2023/Rome/clip.mp4"]);

    let nothing = resolver
        .resolve_multiple(
            root,
            None,
            &PathPattern::parse("/Nowhere/at/all"),
            MatchMode::Exact,
            false,
        )
        .await
        .unwrap();
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn test_expand_matches_every_level() {
    let remote = sample_remote();
    remote.add_container("/Trips/2022", "Rome", NodeKind::Album);
    let root = common::tree(&remote).root(ME).await.unwrap();

    let albums = PathResolver::new(5)
        .expand(root, None, &PathPattern::parse("/Trips/*/Rome"), MatchMode::Glob)
        .await
        .unwrap();

    assert_eq!(paths(&albums), vec!["/Trips/2022/Rome", "/Trips/2023/Rome"]);
}
