//! Integration tests for the shell-style remote operations

use std::sync::Arc;

use mediatree_core::{
    domain::node::{NodeKind, Privacy},
    ports::{ignore_store::IIgnoreStore, prompt::FixedAnswer},
};
use mediatree_sync::{local::JsonIgnoreStore, remote_fs::FsOutcome, MatchMode, SyncError};

use crate::common::{self, FakeRemote, RecordingPrompt, ME};

fn yes() -> Arc<FixedAnswer> {
    Arc::new(FixedAnswer(true))
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn removed(outcomes: &[FsOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            FsOutcome::Removed(path) => Some(path.to_string()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// cd / pwd / resolve
// ============================================================================

#[tokio::test]
async fn test_cd_moves_through_containers() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trips", NodeKind::Folder);
    remote.add_container("/Trips", "2023", NodeKind::Album);
    let fs = common::remote_fs(&remote, yes());

    assert_eq!(fs.pwd().to_string(), "/");
    assert_eq!(fs.cd("Trips").await.unwrap().to_string(), "/Trips");
    assert_eq!(fs.cd("2023").await.unwrap().to_string(), "/Trips/2023");
    assert_eq!(fs.cd("..").await.unwrap().to_string(), "/Trips");
    assert_eq!(fs.cd("/").await.unwrap().to_string(), "/");
    assert_eq!(fs.pwd().to_string(), "/");
}

#[tokio::test]
async fn test_cd_rejects_files_and_missing_paths() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    remote.add_file("/Trip", "a.jpg", b"a");
    let fs = common::remote_fs(&remote, yes());
    fs.cd("/Trip").await.unwrap();

    let err = fs.cd("a.jpg").await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidTarget(_)));

    let err = fs.cd("/Missing").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound { .. }));
    assert_eq!(fs.pwd().to_string(), "/Trip");
}

#[tokio::test]
async fn test_working_directory_only_applies_to_own_tree() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trips", NodeKind::Folder);
    remote.add_container("/Trips", "2023", NodeKind::Album);
    let fs = common::remote_fs(&remote, yes());
    fs.cd("/Trips").await.unwrap();

    let own = fs.resolve(Some(ME), "2023").await.unwrap();
    assert!(own.is_complete());
    assert_eq!(own.deepest().path().to_string(), "/Trips/2023");

    let other = fs.resolve(Some("alice"), "2023").await.unwrap();
    assert!(!other.is_complete());
    assert_eq!(other.deepest().path().to_string(), "/");
}

#[tokio::test]
async fn test_expand_is_relative_to_working_directory() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trips", NodeKind::Folder);
    remote.add_container("/Trips", "Rome", NodeKind::Album);
    remote.add_container("/Trips", "Oslo", NodeKind::Album);
    remote.add_container("/Trips", "Riga", NodeKind::Album);
    let fs = common::remote_fs(&remote, yes());
    fs.cd("/Trips").await.unwrap();

    let found: Vec<String> = fs
        .expand(None, "R*", MatchMode::Glob)
        .await
        .unwrap()
        .iter()
        .map(|node| node.path().to_string())
        .collect();

    assert_eq!(found, vec!["/Trips/Rome", "/Trips/Riga"]);
}

// ============================================================================
// mkdir / mkalbum
// ============================================================================

#[tokio::test]
async fn test_make_node_with_parents_creates_folders_then_leaf() {
    let remote = FakeRemote::new();
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .make_node(None, &strings(&["/a/b/c"]), true, NodeKind::Album, Privacy::Private)
        .await
        .unwrap();

    assert!(matches!(&outcomes[..], [FsOutcome::Created(path)] if path.to_string() == "/a/b/c"));
    assert_eq!(remote.entry("/a").unwrap().kind, NodeKind::Folder);
    assert_eq!(remote.entry("/a/b").unwrap().kind, NodeKind::Folder);
    assert_eq!(remote.entry("/a/b/c").unwrap().kind, NodeKind::Album);
}

#[tokio::test]
async fn test_make_node_reports_existing_and_missing_parents() {
    let remote = FakeRemote::new();
    remote.add_container("/", "a", NodeKind::Folder);
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .make_node(
            None,
            &strings(&["/a", "/x/y", "/a/new"]),
            false,
            NodeKind::Folder,
            Privacy::Public,
        )
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], FsOutcome::Skipped { .. }));
    assert!(matches!(
        outcomes[1],
        FsOutcome::Failed {
            error: SyncError::NotFound { .. },
            ..
        }
    ));
    assert!(matches!(outcomes[2], FsOutcome::Created(_)));
    assert_eq!(FakeRemote::count(&remote.calls.creates), 1);
}

#[tokio::test]
async fn test_make_node_rejects_file_kind() {
    let remote = FakeRemote::new();
    let fs = common::remote_fs(&remote, yes());

    let err = fs
        .make_node(None, &strings(&["/f"]), false, NodeKind::File, Privacy::Public)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidTarget(_)));
}

// ============================================================================
// rmdir
// ============================================================================

#[tokio::test]
async fn test_rmdir_stops_at_non_empty_node() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Full", NodeKind::Folder);
    remote.add_container("/Full", "Inner", NodeKind::Album);
    remote.add_container("/", "Empty", NodeKind::Album);
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .rmdir(None, false, false, true, &strings(&["/Full", "/Empty"]))
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(&outcomes[0], FsOutcome::Skipped { reason, .. } if reason.contains("not empty")));
    assert!(remote.entry("/Empty").is_some());
    assert_eq!(FakeRemote::count(&remote.calls.deletes), 0);
}

#[tokio::test]
async fn test_rmdir_recurse_removes_non_empty_node() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Full", NodeKind::Folder);
    remote.add_container("/Full", "Inner", NodeKind::Album);
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .rmdir(None, false, true, true, &strings(&["/Full"]))
        .await
        .unwrap();

    assert_eq!(removed(&outcomes), vec!["/Full"]);
    assert!(remote.names("/").is_empty());
}

#[tokio::test]
async fn test_rmdir_removes_empty_parents() {
    let remote = FakeRemote::new();
    remote.add_container("/", "a", NodeKind::Folder);
    remote.add_container("/a", "b", NodeKind::Folder);
    remote.add_container("/a/b", "c", NodeKind::Album);
    remote.add_container("/", "keep", NodeKind::Album);
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .rmdir(None, true, false, true, &strings(&["/a/b/c"]))
        .await
        .unwrap();

    assert_eq!(removed(&outcomes), vec!["/a/b/c", "/a/b", "/a"]);
    assert_eq!(remote.names("/"), vec!["keep"]);

    // The working tree sees the removal without a forced refresh
    let listed = fs
        .resolve_multiple(None, "/", MatchMode::Exact, false)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_rmdir_never_removes_root() {
    let remote = FakeRemote::new();
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .rmdir(None, false, true, true, &strings(&["/"]))
        .await
        .unwrap();

    assert!(matches!(&outcomes[..], [FsOutcome::Skipped { .. }]));
    assert_eq!(FakeRemote::count(&remote.calls.deletes), 0);
}

#[tokio::test]
async fn test_rmdir_asks_before_removing() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Empty", NodeKind::Album);
    let prompt = RecordingPrompt::new(false);
    let fs = common::remote_fs(&remote, prompt.clone());

    let outcomes = fs
        .rmdir(None, false, false, false, &strings(&["/Empty"]))
        .await
        .unwrap();

    assert!(matches!(&outcomes[..], [FsOutcome::Skipped { reason, .. }] if reason == "declined"));
    assert_eq!(prompt.asked(), vec!["Remove empty album node \"/Empty\"?"]);
    assert!(remote.entry("/Empty").is_some());
}

// ============================================================================
// rm
// ============================================================================

#[tokio::test]
async fn test_rm_removes_glob_matches() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    remote.add_file("/Trip", "a.jpg", b"a");
    remote.add_file("/Trip", "b.jpg", b"b");
    remote.add_file("/Trip", "c.png", b"c");
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .rm(None, true, false, &strings(&["/Trip/*.jpg"]))
        .await
        .unwrap();

    assert_eq!(removed(&outcomes), vec!["/Trip/a.jpg", "/Trip/b.jpg"]);
    assert_eq!(remote.names("/Trip"), vec!["c.png"]);

    let listed = fs
        .resolve_multiple(None, "/Trip", MatchMode::Exact, false)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_rm_requires_recursive_for_non_empty_containers() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    remote.add_file("/Trip", "a.jpg", b"a");
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .rm(None, true, false, &strings(&["/Trip"]))
        .await
        .unwrap();
    assert!(matches!(&outcomes[..], [FsOutcome::Skipped { .. }]));
    assert!(remote.entry("/Trip").is_some());

    let outcomes = fs.rm(None, true, true, &strings(&["/Trip"])).await.unwrap();
    assert_eq!(removed(&outcomes), vec!["/Trip"]);
    assert!(remote.entry("/Trip").is_none());
}

#[tokio::test]
async fn test_rm_declined_keeps_files() {
    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    remote.add_file("/Trip", "a.jpg", b"a");
    let prompt = RecordingPrompt::new(false);
    let fs = common::remote_fs(&remote, prompt.clone());

    fs.rm(None, false, false, &strings(&["/Trip/a.jpg"]))
        .await
        .unwrap();

    assert_eq!(prompt.asked(), vec!["Remove file node \"/Trip/a.jpg\"?"]);
    assert_eq!(remote.names("/Trip"), vec!["a.jpg"]);
}

#[tokio::test]
async fn test_rm_missing_path_is_skipped() {
    let remote = FakeRemote::new();
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .rm(None, true, false, &strings(&["/nowhere/at/all"]))
        .await
        .unwrap();

    assert!(matches!(&outcomes[..], [FsOutcome::Skipped { .. }]));
}

// ============================================================================
// upload / download
// ============================================================================

#[tokio::test]
async fn test_upload_skips_existing_names() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_file(tmp.path(), "a.jpg", b"local a");
    common::write_file(tmp.path(), "b.jpg", b"local b");

    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    remote.add_file("/Trip", "a.jpg", b"remote a");
    let fs = common::remote_fs(&remote, yes());

    let pattern = tmp.path().join("*.jpg").display().to_string();
    let outcomes = fs.upload(None, &[pattern], "/Trip").await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], FsOutcome::Skipped { .. }));
    assert!(matches!(&outcomes[1], FsOutcome::Uploaded(path) if path.to_string() == "/Trip/b.jpg"));
    assert_eq!(remote.content("/Trip/a.jpg").unwrap(), b"remote a");
    assert_eq!(remote.content("/Trip/b.jpg").unwrap(), b"local b");
}

#[tokio::test]
async fn test_upload_requires_existing_album() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_file(tmp.path(), "a.jpg", b"a");
    let file = tmp.path().join("a.jpg").display().to_string();

    let remote = FakeRemote::new();
    remote.add_container("/", "Folder", NodeKind::Folder);
    let fs = common::remote_fs(&remote, yes());

    let err = fs
        .upload(None, std::slice::from_ref(&file), "/Folder")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InvalidTarget(_)));

    let err = fs.upload(None, &[file], "/Missing").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound { .. }));
    assert_eq!(FakeRemote::count(&remote.calls.uploads), 0);
}

#[tokio::test]
async fn test_download_keeps_existing_files_unless_forced() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_file(tmp.path(), "a.jpg", b"local");

    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    remote.add_file("/Trip", "a.jpg", b"remote");
    remote.add_file("/Trip", "b.jpg", b"remote b");
    let fs = common::remote_fs(&remote, yes());
    let paths = strings(&["/Trip/*.jpg"]);

    let outcomes = fs.download(None, false, &paths, tmp.path()).await.unwrap();
    assert!(matches!(outcomes[0], FsOutcome::Skipped { .. }));
    assert!(matches!(outcomes[1], FsOutcome::Downloaded(_)));
    assert_eq!(std::fs::read(tmp.path().join("a.jpg")).unwrap(), b"local");
    assert_eq!(std::fs::read(tmp.path().join("b.jpg")).unwrap(), b"remote b");

    fs.download(None, true, &paths, tmp.path()).await.unwrap();
    assert_eq!(std::fs::read(tmp.path().join("a.jpg")).unwrap(), b"remote");
}

#[tokio::test]
async fn test_download_skips_containers() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = FakeRemote::new();
    remote.add_container("/", "Trip", NodeKind::Album);
    let fs = common::remote_fs(&remote, yes());

    let outcomes = fs
        .download(None, false, &strings(&["/Trip"]), tmp.path())
        .await
        .unwrap();

    assert!(matches!(&outcomes[..], [FsOutcome::Skipped { .. }]));
    assert_eq!(FakeRemote::count(&remote.calls.downloads), 0);
}

// ============================================================================
// ignore / include
// ============================================================================

#[tokio::test]
async fn test_ignore_then_include_updates_folder_list() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_file(tmp.path(), "a.jpg", b"a");
    common::write_file(tmp.path(), "b.jpg", b"b");
    let fs = common::remote_fs(&FakeRemote::new(), yes());
    let a = tmp.path().join("a.jpg");
    let b = tmp.path().join("b.jpg");

    fs.ignore_or_include(&[a.clone(), b], true).await.unwrap();
    let ignored = JsonIgnoreStore.get(tmp.path()).await.unwrap();
    assert_eq!(ignored.into_iter().collect::<Vec<_>>(), strings(&["a.jpg", "b.jpg"]));

    fs.ignore_or_include(&[a], false).await.unwrap();
    let ignored = JsonIgnoreStore.get(tmp.path()).await.unwrap();
    assert_eq!(ignored.into_iter().collect::<Vec<_>>(), strings(&["b.jpg"]));
}

#[tokio::test]
async fn test_ignore_missing_file_changes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let fs = common::remote_fs(&FakeRemote::new(), yes());

    let err = fs
        .ignore_or_include(&[tmp.path().join("ghost.jpg")], true)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::LocalIo { .. }));
    assert!(!JsonIgnoreStore::settings_path(tmp.path()).exists());
}
