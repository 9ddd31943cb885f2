//! Concurrent writes against a file-backed database
//!
//! Uses the production pool (`init_database`: several connections, WAL,
//! busy timeout) so writers really contend for the SQLite write lock.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;
use songbook_api::db::SongRepository;
use songbook_api::{build_router, AppState};
use songbook_common::db::{init_database, SongDetail, SongFilter, SongUpdate};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: Fresh database file in a temp directory
///
/// The directory must outlive the pool.
async fn file_database() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("songbook.db"))
        .await
        .expect("Should open database");
    (dir, pool)
}

async fn group_names(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM groups ORDER BY name")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_creates_all_succeed() {
    let (_dir, pool) = file_database().await;
    let repo = SongRepository::new(pool.clone());

    let mut handles = Vec::new();
    for i in 0..40 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create(
                &format!("Band {}", i % 4),
                &format!("Song {}", i),
                &SongDetail::default(),
            )
            .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(result.is_ok(), "Concurrent create failed: {:?}", result.err());
    }

    let (songs, total) = repo.list(&SongFilter::default(), 100, 0).await.unwrap();
    assert_eq!(total, 40);
    assert_eq!(songs.len(), 40);
    assert_eq!(
        group_names(&pool).await,
        vec!["Band 0", "Band 1", "Band 2", "Band 3"]
    );

    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_updates_and_deletes_prune_groups() {
    let (_dir, pool) = file_database().await;
    let repo = SongRepository::new(pool.clone());

    let mut ids = Vec::new();
    for i in 0..40 {
        let song = repo
            .create(
                &format!("Band {}", i % 4),
                &format!("Song {}", i),
                &SongDetail::default(),
            )
            .await
            .unwrap();
        ids.push(song.id);
    }

    // Even ids move to one group, odd ids are deleted
    let mut handles = Vec::new();
    for (i, id) in ids.iter().copied().enumerate() {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                let update = SongUpdate {
                    group: Some("Moved".to_string()),
                    ..Default::default()
                };
                repo.update(id, &update).await.map(|song| song.is_some())
            } else {
                repo.delete(id).await
            }
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(
            matches!(result, Ok(true)),
            "Concurrent write failed: {:?}",
            result
        );
    }

    let (songs, total) = repo.list(&SongFilter::default(), 100, 0).await.unwrap();
    assert_eq!(total, 20);
    assert!(songs.iter().all(|s| s.group == "Moved"));
    assert_eq!(group_names(&pool).await, vec!["Moved"]);

    pool.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_post_requests() {
    let (_dir, pool) = file_database().await;
    let app = build_router(AppState::new(pool.clone(), None, Duration::from_secs(10)));

    let mut handles = Vec::new();
    for i in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let request = Request::builder()
                .method("POST")
                .uri("/songs")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "group": format!("Band {}", i % 3), "song": format!("Song {}", i) })
                        .to_string(),
                ))
                .unwrap();
            app.oneshot(request).await.unwrap().status()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 20);

    pool.close().await;
}
