//! Recursive operations: walk, list, remove, pull and push.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use afc_client::core::opcode::OpCode;
use afc_client::utils::paths::HostPathStyle;
use afc_client::{AfcError, ClientConfig, ProtocolError, WalkEntry};
use common::{connect, connect_with, DeviceState, Node};
use futures::TryStreamExt;

fn tree() -> DeviceState {
    DeviceState::default()
        .with_dir("/d")
        .with_file("/d/a.txt", b"alpha")
        .with_dir("/d/sub1")
        .with_file("/d/sub1/x", b"x-ray")
        .with_dir("/d/sub2")
        .with_dir("/d/sub2/sub3")
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn walk_is_pre_order() {
    let (client, _device) = connect(tree());

    let entries: Vec<WalkEntry> = client.walk("/d").try_collect().await.unwrap();
    let directories: Vec<&str> = entries.iter().map(|e| e.directory.as_str()).collect();
    assert_eq!(directories, vec!["/d", "/d/sub1", "/d/sub2", "/d/sub2/sub3"]);

    assert_eq!(entries[0].directories, names(&["sub1", "sub2"]));
    assert_eq!(entries[0].files, names(&["a.txt"]));
    assert_eq!(entries[0].depth, 0);
    assert_eq!(entries[3].depth, 2);
    assert!(entries[3].directories.is_empty() && entries[3].files.is_empty());
}

#[tokio::test]
async fn list_at_depth_zero_is_only_the_root() {
    let (client, device) = connect(tree());

    let paths: Vec<String> = client.list("/d", Some(0)).try_collect().await.unwrap();
    assert_eq!(paths, names(&["/d"]));
    assert!(device.lock().unwrap().received.is_empty());
}

#[tokio::test]
async fn list_stops_at_the_requested_depth() {
    let (client, device) = connect(tree());

    let paths: Vec<String> = client.list("/d", Some(1)).try_collect().await.unwrap();
    assert_eq!(paths, names(&["/d", "/d/sub1", "/d/sub2", "/d/a.txt"]));

    let device = device.lock().unwrap();
    let listed: Vec<String> = device
        .frames(OpCode::ReadDir)
        .iter()
        .map(|r| r.path(0))
        .collect();
    assert_eq!(listed, names(&["/d"]));
}

#[tokio::test]
async fn unbounded_list_reaches_every_entry() {
    let (client, _device) = connect(tree());

    let paths: Vec<String> = client.list("/d", None).try_collect().await.unwrap();
    assert_eq!(
        paths,
        names(&[
            "/d",
            "/d/sub1",
            "/d/sub2",
            "/d/a.txt",
            "/d/sub1/x",
            "/d/sub2/sub3",
        ])
    );
}

#[tokio::test]
async fn forced_remove_of_missing_path_is_a_no_op() {
    let (client, device) = connect(DeviceState::default());

    assert!(client.remove("/missing", true).await.unwrap().is_empty());
    assert!(device.lock().unwrap().frames(OpCode::RemovePath).is_empty());
}

#[tokio::test]
async fn unforced_remove_of_missing_path_fails() {
    let (client, _device) = connect(DeviceState::default());

    let err = client.remove("/missing", false).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Status(AfcError::ObjectNotFound)));
}

#[tokio::test]
async fn remove_deletes_a_whole_tree() {
    let (client, device) = connect(tree());

    assert!(client.remove("/d", false).await.unwrap().is_empty());

    let device = device.lock().unwrap();
    let remaining: Vec<&String> = device.nodes.keys().collect();
    assert_eq!(remaining, vec!["/"]);
}

#[tokio::test]
async fn unforced_remove_reports_every_undeleted_path() {
    let (client, device) = connect(tree().undeletable("/d/sub1/x"));

    let err = client.remove("/d", false).await.unwrap_err();
    match err {
        ProtocolError::RemoveFailed(paths) => {
            assert_eq!(paths, names(&["/d/sub1/x", "/d/sub1", "/d"]));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let device = device.lock().unwrap();
    assert!(device.nodes.contains_key("/d/sub1/x"));
    assert!(!device.nodes.contains_key("/d/a.txt"));
    assert!(!device.nodes.contains_key("/d/sub2"));
}

#[tokio::test]
async fn forced_remove_returns_undeleted_paths() {
    let (client, _device) = connect(tree().undeletable("/d/sub1/x"));

    let undeleted = client.remove("/d", true).await.unwrap();
    assert_eq!(undeleted, names(&["/d/sub1/x", "/d/sub1", "/d"]));
}

#[tokio::test]
async fn unforced_directory_remove_reraises_its_own_failure() {
    let state = DeviceState::default().with_dir("/e").undeletable("/e");
    let (client, device) = connect(state);

    let err = client.remove("/e", false).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Status(AfcError::PermissionDenied)));

    assert_eq!(client.remove("/e", true).await.unwrap(), names(&["/e"]));
    assert!(device.lock().unwrap().nodes.contains_key("/e"));
}

#[tokio::test]
async fn single_file_removal_honours_force() {
    let state = DeviceState::default()
        .with_file("/f", b"data")
        .undeletable("/f");
    let (client, _device) = connect(state);

    assert_eq!(client.remove("/f", true).await.unwrap(), names(&["/f"]));

    let err = client.remove("/f", false).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Status(AfcError::PermissionDenied)));
}

#[tokio::test]
async fn pull_mirrors_a_tree() {
    let (client, _device) = connect(tree());
    let local = tempfile::tempdir().unwrap();

    client.pull("/d", local.path()).await.unwrap();

    let root = local.path().join("d");
    assert_eq!(std::fs::read(root.join("a.txt")).unwrap(), b"alpha");
    assert_eq!(std::fs::read(root.join("sub1").join("x")).unwrap(), b"x-ray");
    assert!(root.join("sub2").join("sub3").is_dir());
}

#[tokio::test]
async fn pull_follows_symlinks() {
    let state = DeviceState::default()
        .with_dir("/d")
        .with_dir("/shared")
        .with_file("/shared/notes", b"linked")
        .with_link("/d/notes", "/shared/notes")
        .with_link("/d/loop", "/d");
    let (client, _device) = connect(state);
    let local = tempfile::tempdir().unwrap();

    client.pull("/d", local.path()).await.unwrap();

    let root = local.path().join("d");
    assert_eq!(std::fs::read(root.join("notes")).unwrap(), b"linked");
    assert!(root.join("loop").is_dir());
}

#[tokio::test]
async fn pull_sanitizes_host_names() {
    let config = ClientConfig {
        host_path_style: HostPathStyle::Windows,
        ..ClientConfig::default()
    };
    let state = DeviceState::default()
        .with_dir("/d")
        .with_file("/d/a:b?.txt", b"odd");
    let (client, _device) = connect_with(state, config);
    let local = tempfile::tempdir().unwrap();

    client.pull("/d", local.path()).await.unwrap();

    assert_eq!(
        std::fs::read(local.path().join("d").join("a_b_.txt")).unwrap(),
        b"odd"
    );
}

#[tokio::test]
async fn push_uploads_a_tree() {
    let (client, device) = connect(DeviceState::default().with_dir("/dest"));
    let local = tempfile::tempdir().unwrap();
    let upload = local.path().join("up");
    std::fs::create_dir_all(upload.join("inner")).unwrap();
    std::fs::write(upload.join("f.txt"), b"top").unwrap();
    std::fs::write(upload.join("inner").join("g.txt"), b"nested").unwrap();

    client.push(&upload, "/dest").await.unwrap();

    let device = device.lock().unwrap();
    assert_eq!(device.nodes.get("/dest/up"), Some(&Node::Dir));
    assert_eq!(device.nodes.get("/dest/up/inner"), Some(&Node::Dir));
    assert_eq!(device.file("/dest/up/f.txt").unwrap(), b"top");
    assert_eq!(device.file("/dest/up/inner/g.txt").unwrap(), b"nested");
}
