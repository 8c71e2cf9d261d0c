// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! tagfetch - concurrent download manager library
//!
//! Downloads run as independent tokio tasks that can be paused, resumed and
//! cancelled while in flight, and can be looked up by tag.
//!
//! # Core Modules
//!
//! - [`download`] - Manager, workers, registry and tag index
//! - [`transport`] - Where bytes come from (HTTP, in-memory)
//! - [`storage`] - Where bytes go (local filesystem)
//! - [`config`] - Persistent configuration
//! - [`cli`] - Interactive console
//! - [`error`] - Error types

pub mod cli;
pub mod colors;
pub mod config;
pub mod download;
pub mod error;
pub mod locks;
pub mod storage;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use download::{
    DownloadHandle, DownloadId, DownloadItem, DownloadManager, DownloadRequest, DownloadStats,
    DownloadStatus,
};
pub use error::{DownloadError, TransferError};
pub use storage::{FsStorage, Storage, StorageError, StorageSink};
pub use transport::{HttpTransport, RemoteResource, Transport, TransportError};
