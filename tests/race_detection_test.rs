// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Race Detection Tests for tagfetch
//!
//! These tests hammer the download manager from many tasks at once. They are
//! designed to detect data races when run with ThreadSanitizer (TSAN).
//!
//! # Running with ThreadSanitizer
//!
//! ```bash
//! # On Linux with nightly Rust:
//! RUSTFLAGS="-Z sanitizer=thread" cargo +nightly test --target x86_64-unknown-linux-gnu --test race_detection_test
//! ```
//!
//! # Test Categories
//!
//! - Concurrent ID allocation
//! - Queries racing with running transfers
//! - Cancel racing with completion
//! - Pause/resume cycles on one download

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tagfetch::transport::memory::{MemoryResource, MemoryTransport};
use tagfetch::{DownloadManager, DownloadStatus, FsStorage};
use tempfile::TempDir;
use tokio::time::timeout;

// Test configuration
const CONCURRENCY_LEVEL: usize = 50;
const ITERATIONS_PER_TASK: usize = 10;
const TEST_TIMEOUT_SECS: u64 = 30;

const FILE_SIZE: usize = 16 * 1024;

fn manager_with(transport: MemoryTransport) -> Arc<DownloadManager> {
    Arc::new(
        DownloadManager::new(Arc::new(transport), Arc::new(FsStorage::new()))
            .expect("Failed to create manager")
            .with_chunk_size(512),
    )
}

fn slow_resource() -> MemoryResource {
    MemoryResource::new(vec![0xAB; FILE_SIZE])
        .pieces_of(1024)
        .piece_delay(Duration::from_millis(1))
}

// =============================================================================
// ID ALLOCATION TESTS
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_get_unique_ids() {
    let dir = Arc::new(TempDir::new().expect("Failed to create temp dir"));
    // Unknown URLs fail fast, so the test measures ID allocation only
    let manager = manager_with(MemoryTransport::new());

    let mut handles = vec![];
    for task in 0..CONCURRENCY_LEVEL {
        let manager = manager.clone();
        let dir = dir.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::with_capacity(ITERATIONS_PER_TASK);
            for i in 0..ITERATIONS_PER_TASK {
                let path = dir.path().join(format!("{task}-{i}"));
                let id = manager
                    .add_download("mem://nowhere", path, 1, [format!("task-{task}")])
                    .expect("add_download failed");
                ids.push(id);
            }
            ids
        }));
    }

    let result = timeout(Duration::from_secs(TEST_TIMEOUT_SECS), async {
        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.expect("Task panicked"));
        }
        all
    })
    .await;

    let ids = result.expect("Test timed out");
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), CONCURRENCY_LEVEL * ITERATIONS_PER_TASK);
    assert_eq!(unique.iter().min(), Some(&1));
    assert_eq!(
        unique.iter().max(),
        Some(&((CONCURRENCY_LEVEL * ITERATIONS_PER_TASK) as u64))
    );

    let listed: Vec<_> = manager.list_all().iter().map(|item| item.id).collect();
    assert!(listed.windows(2).all(|w| w[0] < w[1]), "list_all must be ordered");
    assert_eq!(listed.len(), ids.len());

    for task in 0..CONCURRENCY_LEVEL {
        assert_eq!(
            manager.search_by_tag(&format!("task-{task}")).len(),
            ITERATIONS_PER_TASK
        );
    }
}

// =============================================================================
// QUERY CONSISTENCY TESTS
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queries_see_consistent_snapshots() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let manager = manager_with(MemoryTransport::new().with("mem://slow", slow_resource()));

    let mut ids = Vec::new();
    for i in 0..CONCURRENCY_LEVEL {
        ids.push(
            manager
                .add_download("mem://slow", dir.path().join(format!("f{i}")), 1, ["load"])
                .unwrap(),
        );
    }

    let mut readers = vec![];
    for _ in 0..8 {
        let manager = manager.clone();
        readers.push(tokio::spawn(async move {
            loop {
                let items = manager.search_by_tag("load");
                for item in &items {
                    if item.total_bytes > 0 {
                        assert!(item.downloaded_bytes <= item.total_bytes);
                        let expected = item.downloaded_bytes as f64 / item.total_bytes as f64 * 100.0;
                        assert!((item.progress_percent - expected).abs() < 1e-9, "torn progress");
                    } else {
                        assert_eq!(item.progress_percent, 0.0);
                    }
                    if item.is_terminal() {
                        assert!(item.end_time.is_some());
                    }
                }
                let stats = manager.stats();
                assert_eq!(stats.total(), CONCURRENCY_LEVEL);
                if stats.completed == CONCURRENCY_LEVEL {
                    break;
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    let result = timeout(Duration::from_secs(TEST_TIMEOUT_SECS), async {
        for reader in readers {
            reader.await.expect("Reader panicked");
        }
    })
    .await;
    assert!(result.is_ok(), "Test timed out");

    for id in ids {
        let item = manager.get(id).unwrap();
        assert_eq!(item.downloaded_bytes, FILE_SIZE as u64);
    }
}

// =============================================================================
// STOP SIGNAL TESTS
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_racing_with_completion() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let manager = manager_with(MemoryTransport::new().with("mem://slow", slow_resource()));

    let mut ids = Vec::new();
    for i in 0..CONCURRENCY_LEVEL {
        ids.push(
            manager
                .add_download("mem://slow", dir.path().join(format!("f{i}")), 1, Vec::<String>::new())
                .unwrap(),
        );
    }

    let mut cancellers = vec![];
    for (n, id) in ids.iter().copied().enumerate() {
        let manager = manager.clone();
        cancellers.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis((n % 20) as u64)).await;
            // Losing the race to completion is fine
            let _ = manager.cancel(id);
        }));
    }

    let result = timeout(Duration::from_secs(TEST_TIMEOUT_SECS), async {
        for canceller in cancellers {
            canceller.await.expect("Task panicked");
        }
        for id in &ids {
            manager.subscribe(*id).unwrap().wait().await;
            manager.wait_idle(*id).await.unwrap();
        }
    })
    .await;
    assert!(result.is_ok(), "Test timed out");

    for (i, id) in ids.iter().enumerate() {
        let item = manager.get(*id).unwrap();
        let file = dir.path().join(format!("f{i}"));
        match item.status {
            DownloadStatus::Completed => {
                assert_eq!(std::fs::metadata(&file).unwrap().len(), FILE_SIZE as u64);
            }
            DownloadStatus::Cancelled => {
                assert!(!file.exists(), "cancelled download {} left a file", id);
            }
            other => panic!("download {} ended as {}", id, other),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pause_resume_cycles() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let file = dir.path().join("cycled");
    let manager = manager_with(MemoryTransport::new().with("mem://slow", slow_resource()));

    let id = manager
        .add_download("mem://slow", &file, 1, Vec::<String>::new())
        .unwrap();
    let mut handle = manager.subscribe(id).unwrap();

    let result = timeout(Duration::from_secs(TEST_TIMEOUT_SECS), async {
        handle
            .wait_for(|item| item.status == DownloadStatus::Downloading)
            .await;
        for _ in 0..ITERATIONS_PER_TASK {
            manager.pause(id).unwrap();
            assert_eq!(manager.get(id).unwrap().status, DownloadStatus::Paused);
            manager.resume(id).unwrap();
        }
        handle.wait().await
    })
    .await;

    let item = result.expect("Test timed out");
    assert_eq!(item.status, DownloadStatus::Completed);
    assert_eq!(item.downloaded_bytes, FILE_SIZE as u64);
    assert_eq!(std::fs::read(&file).unwrap(), vec![0xAB; FILE_SIZE]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_stops_every_worker() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let manager = manager_with(MemoryTransport::new().with(
        "mem://slow",
        MemoryResource::new(vec![1u8; 1024 * 1024])
            .pieces_of(1024)
            .piece_delay(Duration::from_millis(1)),
    ));

    let mut ids = Vec::new();
    for i in 0..CONCURRENCY_LEVEL {
        ids.push(
            manager
                .add_download("mem://slow", dir.path().join(format!("f{i}")), 1, Vec::<String>::new())
                .unwrap(),
        );
    }

    let result = timeout(Duration::from_secs(TEST_TIMEOUT_SECS), manager.shutdown()).await;
    assert!(result.is_ok(), "Test timed out");

    for (i, id) in ids.iter().enumerate() {
        let item = manager.get(*id).unwrap();
        assert_eq!(item.status, DownloadStatus::Paused);
        assert!(!dir.path().join(format!("f{i}")).exists());
    }
}
