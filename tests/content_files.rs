// tests/content_files.rs
//! Content-file lifecycle against a real temporary directory.

use conduit::{AppError, ContentFileError, ContentFileManager, Disposition, Outcome};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn manager() -> (TempDir, ContentFileManager) {
    let dir = TempDir::new().unwrap();
    let manager = ContentFileManager::new(dir.path().join("content"));
    (dir, manager)
}

#[test]
fn concurrent_allocations_never_collide() {
    let (_dir, manager) = manager();
    let manager = Arc::new(manager);

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || {
                (0..50)
                    .map(|_| manager.allocate("comment").unwrap().path().to_path_buf())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for worker in workers {
        for path in worker.join().unwrap() {
            assert!(seen.insert(path), "duplicate content path");
        }
    }
    assert_eq!(seen.len(), 400);
}

#[test]
fn successful_use_deletes_the_file() {
    let (_dir, manager) = manager();
    let handle = manager.allocate("page body").unwrap();
    manager.write(&handle, "# Draft").unwrap();
    let path = handle.path().to_path_buf();

    assert_eq!(manager.finalize(handle, Outcome::Success), Disposition::Deleted);
    assert!(!path.exists());
}

#[test]
fn failed_use_archives_with_marker() {
    let (_dir, manager) = manager();
    let handle = manager.allocate("issue description").unwrap();
    manager.write(&handle, "keep me").unwrap();
    let original = handle.path().to_path_buf();
    let basename = handle.file_name().to_string();

    let disposition = manager.finalize(handle, Outcome::Failure("HTTP 409".to_string()));
    let Disposition::Archived { path, marker } = disposition else {
        panic!("expected the file to be archived");
    };

    assert!(!original.exists());
    assert_eq!(path, manager.archive_dir().join(&basename));
    assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");

    let marker = fs::read_to_string(marker.unwrap()).unwrap();
    assert!(marker.contains("reason: HTTP 409"));
    assert!(marker.contains("purpose: issue-description"));
    assert!(marker.contains(&original.display().to_string()));
}

#[test]
fn finalizing_a_missing_file_is_not_an_error() {
    let (_dir, manager) = manager();
    let handle = manager.allocate("comment").unwrap();
    assert_eq!(
        manager.finalize(handle, Outcome::Failure("boom".to_string())),
        Disposition::AlreadyAbsent
    );
}

#[test]
fn adopt_rejects_foreign_and_archived_paths() {
    let (dir, manager) = manager();
    let outside = dir.path().join("notes.md");
    fs::write(&outside, "x").unwrap();
    assert!(matches!(
        manager.adopt(&outside),
        Err(ContentFileError::OutsideContentDir { .. })
    ));

    let handle = manager.allocate("comment").unwrap();
    manager.write(&handle, "x").unwrap();
    let archived = match manager.finalize(handle, Outcome::Failure("no".to_string())) {
        Disposition::Archived { path, .. } => path,
        other => panic!("unexpected {other:?}"),
    };
    assert!(manager.adopt(&archived).is_err());
}

#[tokio::test]
async fn run_with_content_finalizes_by_result() {
    let (_dir, manager) = manager();

    let handle = manager.allocate("comment").unwrap();
    manager.write(&handle, "looks good").unwrap();
    let path = handle.path().to_path_buf();
    let echoed = manager
        .run_with_content(handle, |text| async move { Ok::<_, AppError>(text.len()) })
        .await
        .unwrap();
    assert_eq!(echoed, 10);
    assert!(!path.exists());

    let handle = manager.allocate("comment").unwrap();
    manager.write(&handle, "rejected").unwrap();
    let basename = handle.file_name().to_string();
    let result = manager
        .run_with_content(handle, |_| async {
            Err::<(), _>(AppError::NotFound("page 42".to_string()))
        })
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(manager.archive_dir().join(basename).exists());
}
