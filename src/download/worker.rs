// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-download transfer loop.
//!
//! A worker owns one generation of a download: it waits for the previous
//! generation (if any) to release the item's worker slot, streams the body
//! from the transport into storage, and publishes progress into the item's
//! watch channel. Every publish is conditional on the worker's own stop
//! signal, checked under the channel lock, so once pause/cancel has raised
//! that signal this worker can no longer change the item.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;

use super::registry::RegistryEntry;
use super::types::{DownloadId, DownloadItem, DownloadStatus};
use crate::error::TransferError;
use crate::storage::{Storage, StorageSink};
use crate::transport::{ByteStream, Transport};

/// How a transfer ended.
#[derive(Debug)]
enum Outcome {
    Completed,
    Stopped,
    Failed(TransferError),
}

/// How the body copy ended.
enum Flow {
    Finished,
    Stopped,
}

pub struct DownloadWorker {
    id: DownloadId,
    entry: RegistryEntry,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    chunk_size: usize,
}

impl DownloadWorker {
    pub fn new(
        id: DownloadId,
        entry: RegistryEntry,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        chunk_size: usize,
    ) -> Self {
        Self {
            id,
            entry,
            transport,
            storage,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Drive the download to Completed/Failed, or stop on the signal.
    pub async fn run(self) {
        let _slot = Arc::clone(&self.entry.worker_slot).lock_owned().await;

        let (url, save_path) = {
            let item = self.entry.item.borrow();
            (item.url.clone(), item.save_path.clone())
        };

        let started = self.publish(|item| {
            item.status = DownloadStatus::Downloading;
            item.start_time = Some(Utc::now());
            item.end_time = None;
        });

        let outcome = if started {
            tracing::info!(id = self.id, url = %url, "Download started");
            self.transfer(&url, &save_path).await
        } else {
            Outcome::Stopped
        };

        self.finish(outcome, &save_path).await;
    }

    /// Remove a leftover partial file once no worker holds the slot.
    ///
    /// Cancelling a paused download has no running worker to clean up after
    /// it, so the manager spawns this instead.
    pub async fn discard_partial(entry: RegistryEntry, storage: Arc<dyn Storage>) {
        let _slot = Arc::clone(&entry.worker_slot).lock_owned().await;
        let (id, save_path) = {
            let item = entry.item.borrow();
            (item.id, item.save_path.clone())
        };
        remove_partial(id, storage.as_ref(), &save_path).await;
    }

    /// Apply `update` unless this worker has been told to stop.
    fn publish(&self, update: impl FnOnce(&mut DownloadItem)) -> bool {
        let cancel = &self.entry.cancel;
        self.entry.item.send_if_modified(|item| {
            if cancel.is_cancelled() {
                return false;
            }
            update(item);
            true
        })
    }

    async fn transfer(&self, url: &str, save_path: &Path) -> Outcome {
        let cancel = &self.entry.cancel;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::Stopped,
            fetched = self.transport.fetch(url) => fetched,
        };
        let resource = match fetched {
            Ok(resource) => resource,
            Err(e) => return Outcome::Failed(e.into()),
        };

        let total = resource.total_len.unwrap_or(0);
        if !self.publish(|item| {
            item.total_bytes = total;
            item.record_progress(0);
        }) {
            return Outcome::Stopped;
        }

        let mut sink = match self.storage.open_for_write(save_path, true).await {
            Ok(sink) => sink,
            Err(e) => return Outcome::Failed(e.into()),
        };

        match self.copy_body(resource.body, sink.as_mut(), total).await {
            Ok(Flow::Finished) => Outcome::Completed,
            Ok(Flow::Stopped) => Outcome::Stopped,
            Err(e) => {
                // Keep what was received; the file is left as-is on failure.
                if !matches!(e, TransferError::Storage(_)) {
                    if let Err(flush_err) = sink.flush().await {
                        tracing::warn!(
                            id = self.id,
                            error = %flush_err,
                            "Failed to flush partial file"
                        );
                    }
                }
                Outcome::Failed(e)
            }
        }
    }

    async fn copy_body(
        &self,
        mut body: ByteStream,
        sink: &mut dyn StorageSink,
        total: u64,
    ) -> Result<Flow, TransferError> {
        let cancel = &self.entry.cancel;
        let mut downloaded: u64 = 0;
        let mut next_quarter: u64 = 1;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(Flow::Stopped),
                next = body.next() => next,
            };
            let Some(piece) = next else { break };
            let piece = piece?;

            for chunk in piece.chunks(self.chunk_size) {
                if cancel.is_cancelled() {
                    return Ok(Flow::Stopped);
                }

                let received = downloaded + chunk.len() as u64;
                if total > 0 && received > total {
                    return Err(TransferError::LengthMismatch {
                        expected: total,
                        received,
                    });
                }

                sink.write(chunk).await?;
                downloaded = received;

                if !self.publish(|item| item.record_progress(downloaded)) {
                    return Ok(Flow::Stopped);
                }

                if total > 0 && downloaded * 4 >= total * next_quarter {
                    tracing::debug!(id = self.id, downloaded, total, "Download {}% done", next_quarter * 25);
                    next_quarter = downloaded * 4 / total + 1;
                }
            }
        }

        if total > 0 && downloaded != total {
            return Err(TransferError::LengthMismatch {
                expected: total,
                received: downloaded,
            });
        }

        sink.flush().await?;
        Ok(Flow::Finished)
    }

    async fn finish(&self, outcome: Outcome, save_path: &Path) {
        let stopped = match outcome {
            Outcome::Completed => {
                let published = self.publish(|item| {
                    item.status = DownloadStatus::Completed;
                    item.end_time = Some(Utc::now());
                });
                if published {
                    let item = self.entry.snapshot();
                    tracing::info!(id = self.id, bytes = item.downloaded_bytes, "Download completed");
                }
                !published
            }
            Outcome::Failed(error) => {
                let message = error.to_string();
                let published = self.publish(|item| {
                    item.status = DownloadStatus::Failed;
                    item.error_message = Some(message.clone());
                    item.end_time = Some(Utc::now());
                });
                if published {
                    tracing::warn!(id = self.id, error = %message, "Download failed");
                }
                !published
            }
            Outcome::Stopped => true,
        };

        if stopped {
            let status = self.entry.item.borrow().status;
            tracing::info!(id = self.id, %status, "Download stopped");
            remove_partial(self.id, self.storage.as_ref(), save_path).await;
        }
    }
}

async fn remove_partial(id: DownloadId, storage: &dyn Storage, save_path: &Path) {
    if !storage.exists(save_path).await {
        return;
    }
    match storage.delete(save_path).await {
        Ok(()) => tracing::debug!(id, path = %save_path.display(), "Removed partial file"),
        Err(e) => tracing::warn!(id, error = %e, "Failed to remove partial file"),
    }
}
