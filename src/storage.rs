// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Where downloaded bytes end up.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Write buffer size for destination files (64 KB).
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// An open destination.
#[async_trait]
pub trait StorageSink: Send {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError>;

    /// Push buffered bytes down to the backing store.
    async fn flush(&mut self) -> Result<(), StorageError>;
}

/// Destination store for downloads.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Open `path` for writing, either truncating it or appending to it.
    async fn open_for_write(
        &self,
        path: &Path,
        truncate: bool,
    ) -> Result<Box<dyn StorageSink>, StorageError>;

    /// Remove `path`. Removing a missing file is not an error.
    async fn delete(&self, path: &Path) -> Result<(), StorageError>;

    async fn exists(&self, path: &Path) -> bool;
}

/// Local filesystem storage. Parent directories are created on open.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

#[async_trait]
impl StorageSink for FileSink {
    async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.writer
            .write_all(chunk)
            .await
            .map_err(|e| StorageError::io("write", &self.path, e))
    }

    async fn flush(&mut self) -> Result<(), StorageError> {
        self.writer
            .flush()
            .await
            .map_err(|e| StorageError::io("flush", &self.path, e))
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn open_for_write(
        &self,
        path: &Path,
        truncate: bool,
    ) -> Result<Box<dyn StorageSink>, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io("create directory for", path, e))?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options
            .open(path)
            .await
            .map_err(|e| StorageError::io("open", path, e))?;

        Ok(Box::new(FileSink {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
        }))
    }

    async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io("delete", path, e)),
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }
}
