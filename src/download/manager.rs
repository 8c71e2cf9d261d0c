// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download manager: assigns IDs, launches workers, answers queries.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::registry::{DownloadRegistry, RegistryEntry};
use super::tags::TagIndex;
use super::types::{DownloadId, DownloadItem, DownloadRequest, DownloadStats, DownloadStatus};
use super::worker::DownloadWorker;
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::DownloadError;
use crate::storage::Storage;
use crate::transport::Transport;

/// Handle to a download, allowing status checks.
#[derive(Debug, Clone)]
pub struct DownloadHandle {
    pub id: DownloadId,
    progress_rx: watch::Receiver<DownloadItem>,
}

impl DownloadHandle {
    /// Get the current state.
    pub fn progress(&self) -> DownloadItem {
        self.progress_rx.borrow().clone()
    }

    /// Check if the download reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.progress_rx.borrow().is_terminal()
    }

    /// Wait for the download to reach a terminal state.
    pub async fn wait(&mut self) -> DownloadItem {
        self.wait_for(DownloadItem::is_terminal).await
    }

    /// Wait for the first state matching `pred`.
    ///
    /// Only the latest state is observed, so short-lived intermediate states
    /// may be skipped. If the download is dropped from the manager before
    /// `pred` matches, the last known state is returned.
    pub async fn wait_for(&mut self, mut pred: impl FnMut(&DownloadItem) -> bool) -> DownloadItem {
        loop {
            {
                let item = self.progress_rx.borrow_and_update();
                if pred(&item) {
                    return item.clone();
                }
            }
            if self.progress_rx.changed().await.is_err() {
                // Channel closed
                return self.progress_rx.borrow().clone();
            }
        }
    }
}

/// Manager for concurrent downloads.
///
/// All operations are synchronous and return immediately; transfers run on
/// the tokio runtime the manager was created in, one task per download.
pub struct DownloadManager {
    registry: DownloadRegistry,
    tags: TagIndex,
    next_id: AtomicU64,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    runtime: Handle,
    tasks: TaskTracker,
    chunk_size: usize,
    accepting: AtomicBool,
}

impl DownloadManager {
    /// Create a manager bound to the current tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn Storage>) -> Result<Self, DownloadError> {
        let runtime = Handle::try_current().map_err(|e| DownloadError::Runtime(e.to_string()))?;
        Ok(Self {
            registry: DownloadRegistry::new(),
            tags: TagIndex::new(),
            next_id: AtomicU64::new(1),
            transport,
            storage,
            runtime,
            tasks: TaskTracker::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            accepting: AtomicBool::new(true),
        })
    }

    /// Largest slice a worker writes before checking its stop signal.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Queue a download and start it in the background.
    pub fn add_download<I, S>(
        &self,
        url: &str,
        save_path: impl Into<PathBuf>,
        thread_count: u32,
        tags: I,
    ) -> Result<DownloadId, DownloadError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submit(DownloadRequest::new(url, save_path).threads(thread_count).tags(tags))
    }

    /// Queue `request` and start it in the background. Returns the new ID.
    pub fn submit(&self, request: DownloadRequest) -> Result<DownloadId, DownloadError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(DownloadError::InvalidRequest(
                "manager is shutting down".to_string(),
            ));
        }
        if request.url.trim().is_empty() {
            return Err(DownloadError::InvalidRequest("URL must not be empty".to_string()));
        }
        if request.save_path.to_string_lossy().trim().is_empty() {
            return Err(DownloadError::InvalidRequest(
                "save path must not be empty".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut request = request;
        request.url = request.url.trim().to_string();
        let item = DownloadItem::new(id, request);

        self.tags.insert(id, &item.tags);
        let entry = RegistryEntry::new(item);
        self.registry.insert(id, entry.clone());

        tracing::info!(id, url = %entry.item.borrow().url, "Download queued");
        self.launch(id, entry);
        Ok(id)
    }

    /// Stop a Queued or Downloading item and mark it Paused. The partial file
    /// is removed.
    pub fn pause(&self, id: DownloadId) -> Result<(), DownloadError> {
        self.halt(id, DownloadStatus::Paused, |s| s.is_active(), "pause")?;
        tracing::info!(id, "Download paused");
        Ok(())
    }

    /// Restart a Paused item from byte zero with a fresh worker.
    pub fn resume(&self, id: DownloadId) -> Result<(), DownloadError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(DownloadError::InvalidRequest(
                "manager is shutting down".to_string(),
            ));
        }

        let entry = self
            .registry
            .with_entry_mut(id, |entry| {
                let status = entry.item.borrow().status;
                if status != DownloadStatus::Paused {
                    return Err(DownloadError::InvalidState {
                        id,
                        status,
                        operation: "resume",
                    });
                }
                entry.cancel = CancellationToken::new();
                entry.item.send_modify(|item| {
                    item.reset_transfer();
                    item.status = DownloadStatus::Downloading;
                });
                Ok(entry.clone())
            })
            .ok_or(DownloadError::NotFound(id))??;

        tracing::info!(id, "Download resumed");
        self.launch(id, entry);
        Ok(())
    }

    /// Stop a Queued, Downloading or Paused item for good.
    pub fn cancel(&self, id: DownloadId) -> Result<(), DownloadError> {
        let previous = self.halt(id, DownloadStatus::Cancelled, |s| !s.is_terminal(), "cancel")?;

        if previous == DownloadStatus::Paused {
            if let Some(entry) = self.registry.get(id) {
                let discard = DownloadWorker::discard_partial(entry.clone(), Arc::clone(&self.storage));
                self.spawn_for(&entry, discard);
            }
        }
        tracing::info!(id, from = %previous, "Download cancelled");
        Ok(())
    }

    /// Items indexed under `tag`, in the order they were added.
    pub fn search_by_tag(&self, tag: &str) -> Vec<DownloadItem> {
        self.registry.snapshots_of(&self.tags.lookup(tag.trim()))
    }

    /// Every registered item, ascending by ID.
    pub fn list_all(&self) -> Vec<DownloadItem> {
        self.registry.snapshots()
    }

    pub fn get(&self, id: DownloadId) -> Result<DownloadItem, DownloadError> {
        self.registry
            .get(id)
            .map(|entry| entry.snapshot())
            .ok_or(DownloadError::NotFound(id))
    }

    pub fn subscribe(&self, id: DownloadId) -> Result<DownloadHandle, DownloadError> {
        self.registry
            .get(id)
            .map(|entry| DownloadHandle {
                id,
                progress_rx: entry.item.subscribe(),
            })
            .ok_or(DownloadError::NotFound(id))
    }

    /// All tags ever used, sorted.
    pub fn known_tags(&self) -> Vec<String> {
        self.tags.tags()
    }

    pub fn stats(&self) -> DownloadStats {
        let mut stats = DownloadStats::default();
        for item in self.registry.snapshots() {
            stats.record(item.status);
        }
        stats
    }

    /// Drop Completed, Failed and Cancelled items. Returns how many were removed.
    pub fn clear_finished(&self) -> usize {
        let removed = self.registry.remove_where(DownloadItem::is_terminal);
        if removed > 0 {
            tracing::debug!(removed, "Cleared finished downloads");
        }
        removed
    }

    /// Wait until every task spawned for `id` so far has returned.
    pub async fn wait_idle(&self, id: DownloadId) -> Result<(), DownloadError> {
        let entry = self.registry.get(id).ok_or(DownloadError::NotFound(id))?;
        entry.idle().await;
        Ok(())
    }

    /// Refuse new work, pause everything in flight and wait for workers to stop.
    pub async fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);

        let entries = self.registry.entries();
        for (id, _) in &entries {
            if self
                .halt(*id, DownloadStatus::Paused, |s| s.is_active(), "pause")
                .is_ok()
            {
                tracing::debug!(id, "Paused for shutdown");
            }
        }
        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!("Download manager shut down");
    }

    fn launch(&self, id: DownloadId, entry: RegistryEntry) {
        let worker = DownloadWorker::new(
            id,
            entry.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.storage),
            self.chunk_size,
        );
        self.spawn_for(&entry, worker.run());
    }

    /// Spawn a task on behalf of `entry`, visible to `wait_idle` and `shutdown`
    /// from the moment this returns.
    fn spawn_for<F>(&self, entry: &RegistryEntry, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let running = entry.track_task();
        self.tasks.spawn_on(
            async move {
                task.await;
                drop(running);
            },
            &self.runtime,
        );
    }

    /// Move `id` to `target` and raise its stop signal, if `allowed` accepts
    /// the current status. Returns the status it had before.
    ///
    /// The check, the status change and the signal happen under the item's
    /// channel lock, so a worker can never publish after the signal went up.
    fn halt(
        &self,
        id: DownloadId,
        target: DownloadStatus,
        allowed: impl Fn(DownloadStatus) -> bool,
        operation: &'static str,
    ) -> Result<DownloadStatus, DownloadError> {
        self.registry
            .with_entry(id, |entry| {
                let mut outcome = Err(DownloadError::NotFound(id));
                entry.item.send_if_modified(|item| {
                    if !allowed(item.status) {
                        outcome = Err(DownloadError::InvalidState {
                            id,
                            status: item.status,
                            operation,
                        });
                        return false;
                    }
                    outcome = Ok(item.status);
                    item.status = target;
                    item.end_time = Some(Utc::now());
                    entry.cancel.cancel();
                    true
                });
                outcome
            })
            .ok_or(DownloadError::NotFound(id))?
    }
}

impl std::fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadManager")
            .field("downloads", &self.registry.len())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}
