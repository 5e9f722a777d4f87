//! Integration tests for the remote tree cache

use mediatree_core::domain::node::{NodeKind, Privacy};
use mediatree_sync::SyncError;

use crate::common::{self, FakeRemote, ME};

// ============================================================================
// Listing and caching
// ============================================================================

#[tokio::test]
async fn test_get_children_follows_every_page() {
    let remote = FakeRemote::new();
    for name in ["a", "b", "c", "d", "e"] {
        remote.add_container("/", name, NodeKind::Album);
    }
    let tree = common::tree(&remote);
    let root = tree.root(ME).await.unwrap();

    let names: Vec<String> = root
        .get_children(false)
        .await
        .unwrap()
        .iter()
        .map(|child| child.name().to_string())
        .collect();

    assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    // 5 children with 2 per page
    assert_eq!(FakeRemote::count(&remote.calls.lists), 3);
}

#[tokio::test]
async fn test_children_are_served_from_cache_until_forced() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    let tree = common::tree(&remote);
    let root = tree.root(ME).await.unwrap();

    root.get_children(false).await.unwrap();
    root.get_child("Trip").await.unwrap();
    assert_eq!(FakeRemote::count(&remote.calls.lists), 1);

    root.get_children(true).await.unwrap();
    assert_eq!(FakeRemote::count(&remote.calls.lists), 2);
}

#[tokio::test]
async fn test_empty_child_list_is_refetched() {
    let remote = FakeRemote::new();
    let tree = common::tree(&remote);
    let root = tree.root(ME).await.unwrap();

    assert!(root.get_children(false).await.unwrap().is_empty());
    remote.add_container("/", "Later", NodeKind::Folder);
    let children = root.get_children(false).await.unwrap();

    assert_eq!(children.len(), 1);
    assert_eq!(children[0].path().to_string(), "/Later");
}

#[tokio::test]
async fn test_get_child_is_case_sensitive() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    let root = common::tree(&remote).root(ME).await.unwrap();

    assert!(root.get_child("Trip").await.unwrap().is_some());
    assert!(root.get_child("trip").await.unwrap().is_none());
}

#[tokio::test]
async fn test_listed_names_with_separator_do_not_break_listing() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    remote.add_container("/", "a/b", NodeKind::Album);
    let root = common::tree(&remote).root(ME).await.unwrap();

    assert_eq!(root.get_children(false).await.unwrap().len(), 2);
    assert!(root.get_child("Trip").await.unwrap().is_some());

    let odd = root.get_child("a/b").await.unwrap().unwrap();
    assert_eq!(odd.path().depth(), 1);
    assert_eq!(odd.path().name(), Some("a/b"));
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_created_child_is_appended_to_cache() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Existing", NodeKind::Folder);
    let tree = common::tree(&remote);
    let root = tree.root(ME).await.unwrap();
    root.get_children(false).await.unwrap();
    let version = root.cache_version();

    let created = root
        .get_or_create_child("New", NodeKind::Album, Privacy::Unlisted)
        .await
        .unwrap();

    assert_eq!(created.kind(), NodeKind::Album);
    assert_eq!(created.path().to_string(), "/New");
    assert!(root.cache_version() > version);
    // Served from the updated cache, no refetch
    let lists = FakeRemote::count(&remote.calls.lists);
    assert!(root.get_child("New").await.unwrap().is_some());
    assert_eq!(FakeRemote::count(&remote.calls.lists), lists);
}

#[tokio::test]
async fn test_concurrent_get_or_create_issues_one_create() {
    let remote = FakeRemote::new();
    let tree = common::tree(&remote);
    let root = tree.root(ME).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let root = root.clone();
            tokio::spawn(async move {
                root.get_or_create_child("Trip", NodeKind::Album, Privacy::Public)
                    .await
                    .unwrap()
                    .id()
                    .clone()
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }

    assert_eq!(FakeRemote::count(&remote.calls.creates), 1);
    assert!(ids.iter().all(|id| *id == ids[0]));
    assert_eq!(remote.names("/"), vec!["Trip"]);
}

#[tokio::test]
async fn test_create_conflict_reuses_existing_node() {
    let remote = FakeRemote::new();
    let tree = common::tree(&remote);
    let root = tree.root(ME).await.unwrap();
    // Cache an empty listing, then let someone else create the node
    root.get_children(false).await.unwrap();
    remote.add_container("/", "Other", NodeKind::Folder);
    root.get_children(false).await.unwrap();
    let existing = remote.add_container("/", "Trip", NodeKind::Album);

    let node = root
        .get_or_create_child("Trip", NodeKind::Album, Privacy::Public)
        .await
        .unwrap();

    assert_eq!(node.id(), &existing);
    assert_eq!(FakeRemote::count(&remote.calls.creates), 1);
    assert_eq!(remote.names("/"), vec!["Other", "Trip"]);
}

#[tokio::test]
async fn test_create_failure_is_reported_with_operation() {
    let remote = FakeRemote::new();
    remote.fail_creates_named("Broken");
    let root = common::tree(&remote).root(ME).await.unwrap();

    let err = root
        .get_or_create_child("Broken", NodeKind::Folder, Privacy::Public)
        .await
        .unwrap_err();

    match err {
        SyncError::Remote { operation, source } => {
            assert!(operation.contains("Broken"));
            assert_eq!(source.status, 500);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_cache_limit_bounds_cached_lists() {
    let remote = FakeRemote::new();
    for name in ["a", "b", "c", "d"] {
        remote.add_container("/", name, NodeKind::Folder);
        remote.add_container(&format!("/{name}"), "inner", NodeKind::Album);
    }
    let tree = common::tree(&remote);
    tree.set_max_cached_nodes(Some(2));
    let root = tree.root(ME).await.unwrap();

    for child in root.get_children(false).await.unwrap() {
        assert!(child.get_child("inner").await.unwrap().is_some());
        assert!(tree.cached_nodes() <= 2);
    }

    // Evicted lists are fetched again on demand
    let lists = FakeRemote::count(&remote.calls.lists);
    assert_eq!(root.get_children(false).await.unwrap().len(), 4);
    assert!(FakeRemote::count(&remote.calls.lists) > lists);
}

// ============================================================================
// Deletion, upload, download
// ============================================================================

#[tokio::test]
async fn test_delete_leaves_parent_cache_until_invalidated() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Old", NodeKind::Album);
    let tree = common::tree(&remote);
    let root = tree.root(ME).await.unwrap();
    let old = root.get_child("Old").await.unwrap().unwrap();

    old.delete().await.unwrap();
    assert!(remote.entry("/Old").is_none());
    assert!(root.get_child("Old").await.unwrap().is_some());

    old.invalidate_parent_cache();
    assert!(root.get_child("Old").await.unwrap().is_none());
}

#[tokio::test]
async fn test_upload_requires_an_album() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Folder", NodeKind::Folder);
    let root = common::tree(&remote).root(ME).await.unwrap();
    let folder = root.get_child("Folder").await.unwrap().unwrap();

    let err = folder
        .upload("a.jpg", b"data", Box::new(|_percent: u8| false))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidTarget(_)));
    assert_eq!(FakeRemote::count(&remote.calls.uploads), 0);
}

#[tokio::test]
async fn test_uploaded_file_can_be_downloaded() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    let tree = common::tree(&remote);
    let album = tree
        .root(ME)
        .await
        .unwrap()
        .get_child("Trip")
        .await
        .unwrap()
        .unwrap();

    let file = album
        .upload("a.jpg", b"pixels", Box::new(|_percent: u8| false))
        .await
        .unwrap();

    assert_eq!(file.path().to_string(), "/Trip/a.jpg");
    assert_eq!(file.download().await.unwrap(), b"pixels");
}
