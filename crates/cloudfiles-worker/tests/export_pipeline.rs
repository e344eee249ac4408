//! End-to-end tests for the folder export pipeline, including round trips
//! through the import pipeline.

mod common;

use cloudfiles_core::traits::storage::ObjectStore;
use cloudfiles_database::{Catalog, CatalogTransaction};
use cloudfiles_entity::entry::NewEntry;
use cloudfiles_entity::task::{TaskKind, TaskStatus};
use uuid::Uuid;

use common::{Harness, MIB, payload_bytes, zip_bytes, zip_contents};

#[tokio::test]
async fn test_export_uploads_archive_and_records_path() {
    let h = Harness::new().await;
    let blob_path = h.dir.path().join("blob");
    let png = payload_bytes(2048, 1);
    std::fs::write(&blob_path, &png).unwrap();
    h.store.put_file("u-1/2025/03/7/1-b.png", &blob_path).await.unwrap();

    let mut tx = h.catalog.begin().await.unwrap();
    let project = tx
        .insert_entry(&NewEntry::folder("u-1", "project", None))
        .await
        .unwrap();
    let note = tx
        .insert_entry(&NewEntry::file("u-1", "a.md", Some(project), true))
        .await
        .unwrap();
    tx.set_entry_object(note, None, 5, Some("md")).await.unwrap();
    tx.insert_content(note, "u-1", "a.md", Some("md"), "hello")
        .await
        .unwrap();
    let image = tx
        .insert_entry(&NewEntry::file("u-1", "b.png", Some(project), false))
        .await
        .unwrap();
    tx.set_entry_object(image, Some("u-1/2025/03/7/1-b.png"), 2048, Some("png"))
        .await
        .unwrap();
    tx.insert_entry(&NewEntry::folder("u-1", "sub", Some(project)))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let payload = h.stage_export("t-1", "u-1", Some(project), "project.zip").await;
    let task = h.run(TaskKind::Export, &payload).await;

    assert_eq!(task.status, TaskStatus::Successed, "{:?}", task.message);
    assert_eq!(task.object_path.as_deref(), Some("archive/u-1/t-1/project.zip"));
    assert!(!h.staging_dir(TaskKind::Export, "t-1").exists());

    let archive = h.object_bytes("archive/u-1/t-1/project.zip").await;
    assert_eq!(
        zip_contents(&archive),
        vec![
            ("a.md".to_string(), b"hello".to_vec()),
            ("b.png".to_string(), png),
        ]
    );
}

#[tokio::test]
async fn test_export_of_unknown_folder_fails() {
    let h = Harness::new().await;
    let payload = h
        .stage_export("t-1", "u-1", Some(Uuid::new_v4()), "out.zip")
        .await;

    let task = h.run(TaskKind::Export, &payload).await;
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.message.unwrap().contains("not found"));
    assert!(task.object_path.is_none());
    assert!(!h.staging_dir(TaskKind::Export, "t-1").exists());
}

#[tokio::test]
async fn test_export_fails_when_object_is_missing() {
    let h = Harness::new().await;
    let mut tx = h.catalog.begin().await.unwrap();
    let file = tx
        .insert_entry(&NewEntry::file("u-1", "lost.bin", None, false))
        .await
        .unwrap();
    tx.set_entry_object(file, Some("u-1/gone.bin"), 10, Some("bin"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let payload = h.stage_export("t-1", "u-1", None, "out.zip").await;
    let task = h.run(TaskKind::Export, &payload).await;
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.message.unwrap().starts_with("Export failed"));
    assert!(!h.store.exists("archive/u-1/t-1/out.zip").await.unwrap());
}

#[tokio::test]
async fn test_round_trip_reproduces_tree() {
    let h = Harness::new().await;
    h.catalog.set_quota("u-1", 20 * MIB as u128, 0).await;
    h.catalog.set_quota("u-2", 20 * MIB as u128, 0).await;

    let big = payload_bytes(MIB + 123, 9);
    let small = payload_bytes(77, 4);
    let archive = zip_bytes(&[
        ("notes.txt", &b"line one\nline two\n"[..]),
        ("src/", &b""[..]),
        ("src/main.rs", &b"fn main() {}\n"[..]),
        ("src/assets/logo.bin", &small[..]),
        ("video.raw", &big[..]),
        ("zero.dat", &b""[..]),
    ]);
    let payload = h.stage_import("t-in", "u-1", None, "tree.zip", &archive).await;
    let task = h.run(TaskKind::Import, &payload).await;
    assert_eq!(task.status, TaskStatus::Successed, "{:?}", task.message);

    let payload = h.stage_export("t-out", "u-1", None, "tree.zip").await;
    let task = h.run(TaskKind::Export, &payload).await;
    assert_eq!(task.status, TaskStatus::Successed, "{:?}", task.message);

    let exported = h.object_bytes(task.object_path.as_deref().unwrap()).await;
    assert_eq!(zip_contents(&exported), zip_contents(&archive));

    // The exported archive imports cleanly for another user.
    let payload = h
        .stage_import_from_key("t-again", "u-2", None, "tree.zip", "archive/u-1/t-out/tree.zip")
        .await;
    let task = h.run(TaskKind::Import, &payload).await;
    assert_eq!(task.status, TaskStatus::Successed, "{:?}", task.message);

    let mut first: Vec<(String, Option<i64>)> = h
        .files_of("u-1")
        .await
        .into_iter()
        .map(|e| (e.name, e.size))
        .collect();
    let mut second: Vec<(String, Option<i64>)> = h
        .files_of("u-2")
        .await
        .into_iter()
        .map(|e| (e.name, e.size))
        .collect();
    first.sort();
    second.sort();
    assert_eq!(first, second);
    assert_eq!(h.used_bytes("u-1").await, h.used_bytes("u-2").await);
}

#[tokio::test]
async fn test_editable_and_binary_files_survive_round_trip() {
    let h = Harness::new().await;
    h.catalog.set_quota("u-1", MIB as u128, 0).await;

    let png = payload_bytes(2048, 42);
    let mut tx = h.catalog.begin().await.unwrap();
    let folder = tx
        .insert_entry(&NewEntry::folder("u-1", "share", None))
        .await
        .unwrap();
    let note = tx
        .insert_entry(&NewEntry::file("u-1", "a.md", Some(folder), true))
        .await
        .unwrap();
    tx.set_entry_object(note, None, 5, Some("md")).await.unwrap();
    tx.insert_content(note, "u-1", "a.md", Some("md"), "hello")
        .await
        .unwrap();
    let image = tx
        .insert_entry(&NewEntry::file("u-1", "b.png", Some(folder), false))
        .await
        .unwrap();
    let blob_path = h.dir.path().join("b.png");
    std::fs::write(&blob_path, &png).unwrap();
    h.store.put_file("u-1/seed/b.png", &blob_path).await.unwrap();
    tx.set_entry_object(image, Some("u-1/seed/b.png"), 2048, Some("png"))
        .await
        .unwrap();
    let target = tx
        .insert_entry(&NewEntry::folder("u-1", "restored", None))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let payload = h.stage_export("t-out", "u-1", Some(folder), "share.zip").await;
    let task = h.run(TaskKind::Export, &payload).await;
    assert_eq!(task.status, TaskStatus::Successed, "{:?}", task.message);

    let payload = h
        .stage_import_from_key(
            "t-in",
            "u-1",
            Some(target),
            "share.zip",
            task.object_path.as_deref().unwrap(),
        )
        .await;
    let task = h.run(TaskKind::Import, &payload).await;
    assert_eq!(task.status, TaskStatus::Successed, "{:?}", task.message);

    let restored = h.catalog.list_children("u-1", Some(target)).await.unwrap();
    assert_eq!(restored.len(), 2);

    let md = restored.iter().find(|e| e.name == "a.md").unwrap();
    assert!(md.online_editable);
    let blob = h.catalog.find_content(md.id, "u-1").await.unwrap().unwrap();
    assert_eq!(blob.content, "hello");

    let png_entry = restored.iter().find(|e| e.name == "b.png").unwrap();
    assert_eq!(png_entry.size, Some(2048));
    assert_eq!(
        h.object_bytes(png_entry.object_path.as_deref().unwrap()).await,
        png
    );
}
