// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Concurrent download system.
//!
//! Every download runs as its own tokio task and can be paused, resumed or
//! cancelled while in flight. Progress is published through a watch channel
//! per download, so queries never wait on a transfer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │ DownloadManager │────▶│ DownloadWorker  │ (one tokio task each)
//! │                 │     │                 │
//! └────────┬────────┘     └───┬─────────┬───┘
//!          │                  │         │
//!          ▼                  ▼         ▼
//! ┌─────────────────┐  ┌───────────┐ ┌─────────┐
//! │ DownloadRegistry│  │ Transport │ │ Storage │
//! │ + TagIndex      │  └───────────┘ └─────────┘
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tagfetch::download::DownloadManager;
//! use tagfetch::storage::FsStorage;
//! use tagfetch::transport::HttpTransport;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manager = DownloadManager::new(Arc::new(HttpTransport::new()?), Arc::new(FsStorage::new()))?;
//!
//! // Queue a download
//! let id = manager.add_download("https://example.com/file.iso", "/tmp/file.iso", 1, ["media"])?;
//!
//! // Check progress
//! let item = manager.get(id)?;
//! println!("Status: {}", item.status);
//!
//! // Or wait for completion
//! let finished = manager.subscribe(id)?.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod registry;
pub mod tags;
pub mod types;
pub mod worker;

// Re-export commonly used items
pub use manager::{DownloadHandle, DownloadManager};
pub use types::{DownloadId, DownloadItem, DownloadRequest, DownloadStats, DownloadStatus};
