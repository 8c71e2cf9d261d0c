// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Registry of downloads: ID → live item + current stop signal.
//!
//! Lock order is always registry first, then the item's watch channel. Workers
//! hold a clone of their entry and never touch the registry, so they only ever
//! take the second lock.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

use super::types::{DownloadId, DownloadItem};
use crate::locks::{resilient_read, resilient_write};

/// One registered download.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Live state. Workers publish into it, queries clone out of it.
    pub item: Arc<watch::Sender<DownloadItem>>,
    /// Stop signal of the current worker generation.
    pub cancel: CancellationToken,
    /// Held by a worker for its whole run so generations never overlap.
    pub worker_slot: Arc<Mutex<()>>,
    /// Tasks spawned for this entry that have not returned yet.
    running: Arc<watch::Sender<usize>>,
}

/// Counts one spawned task against its entry until dropped.
#[derive(Debug)]
pub struct RunningGuard(Arc<watch::Sender<usize>>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl RegistryEntry {
    pub fn new(item: DownloadItem) -> Self {
        let (tx, _rx) = watch::channel(item);
        Self {
            item: Arc::new(tx),
            cancel: CancellationToken::new(),
            worker_slot: Arc::new(Mutex::new(())),
            running: Arc::new(watch::channel(0).0),
        }
    }

    /// Count a task as running for this entry. Call before spawning it.
    pub fn track_task(&self) -> RunningGuard {
        self.running.send_modify(|n| *n += 1);
        RunningGuard(Arc::clone(&self.running))
    }

    pub fn running_tasks(&self) -> usize {
        *self.running.borrow()
    }

    /// Resolve once every tracked task has returned.
    pub async fn idle(&self) {
        let mut rx = self.running.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> DownloadItem {
        self.item.borrow().clone()
    }
}

#[derive(Debug, Default)]
pub struct DownloadRegistry {
    entries: RwLock<BTreeMap<DownloadId, RegistryEntry>>,
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: DownloadId, entry: RegistryEntry) {
        resilient_write(&self.entries).insert(id, entry);
    }

    pub fn get(&self, id: DownloadId) -> Option<RegistryEntry> {
        resilient_read(&self.entries).get(&id).cloned()
    }

    pub fn contains(&self, id: DownloadId) -> bool {
        resilient_read(&self.entries).contains_key(&id)
    }

    pub fn len(&self) -> usize {
        resilient_read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` on the entry while holding the registry read lock.
    ///
    /// Used by pause/cancel so their status change and stop signal cannot
    /// interleave with a resume swapping the token.
    pub fn with_entry<R>(&self, id: DownloadId, f: impl FnOnce(&RegistryEntry) -> R) -> Option<R> {
        resilient_read(&self.entries).get(&id).map(f)
    }

    /// Run `f` on the entry while holding the registry write lock.
    pub fn with_entry_mut<R>(
        &self,
        id: DownloadId,
        f: impl FnOnce(&mut RegistryEntry) -> R,
    ) -> Option<R> {
        resilient_write(&self.entries).get_mut(&id).map(f)
    }

    /// Snapshots of every entry, ascending by ID.
    pub fn snapshots(&self) -> Vec<DownloadItem> {
        resilient_read(&self.entries)
            .values()
            .map(RegistryEntry::snapshot)
            .collect()
    }

    /// Snapshots of the registered IDs among `ids`, in the given order.
    pub fn snapshots_of(&self, ids: &[DownloadId]) -> Vec<DownloadItem> {
        let entries = resilient_read(&self.entries);
        ids.iter()
            .filter_map(|id| entries.get(id))
            .map(RegistryEntry::snapshot)
            .collect()
    }

    /// Clones of every entry, ascending by ID.
    pub fn entries(&self) -> Vec<(DownloadId, RegistryEntry)> {
        resilient_read(&self.entries)
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect()
    }

    /// Drop every entry whose current state matches `pred`. Returns how many went.
    pub fn remove_where(&self, pred: impl Fn(&DownloadItem) -> bool) -> usize {
        let mut entries = resilient_write(&self.entries);
        let before = entries.len();
        entries.retain(|_, entry| !pred(&entry.item.borrow()));
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::types::{DownloadRequest, DownloadStatus};

    fn entry(id: DownloadId) -> RegistryEntry {
        RegistryEntry::new(DownloadItem::new(id, DownloadRequest::new("u", "p")))
    }

    #[test]
    fn test_snapshots_are_ordered_by_id() {
        let registry = DownloadRegistry::new();
        registry.insert(3, entry(3));
        registry.insert(1, entry(1));
        registry.insert(2, entry(2));

        let ids: Vec<_> = registry.snapshots().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_snapshots_of_skips_unregistered() {
        let registry = DownloadRegistry::new();
        registry.insert(1, entry(1));
        let items = registry.snapshots_of(&[5, 1, 9]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, 1);
    }

    #[test]
    fn test_snapshot_reflects_published_state() {
        let registry = DownloadRegistry::new();
        registry.insert(1, entry(1));
        let live = registry.get(1).unwrap();
        live.item.send_modify(|item| {
            item.status = DownloadStatus::Downloading;
            item.total_bytes = 100;
            item.record_progress(40);
        });

        let snapshot = registry.get(1).unwrap().snapshot();
        assert_eq!(snapshot.status, DownloadStatus::Downloading);
        assert_eq!(snapshot.progress_percent, 40.0);
    }

    #[test]
    fn test_with_entry_mut_replaces_token() {
        let registry = DownloadRegistry::new();
        registry.insert(1, entry(1));
        let old = registry.get(1).unwrap().cancel;

        registry.with_entry_mut(1, |entry| entry.cancel = CancellationToken::new());
        old.cancel();

        assert!(!registry.get(1).unwrap().cancel.is_cancelled());
        assert!(registry.with_entry_mut(2, |_| ()).is_none());
    }

    #[tokio::test]
    async fn test_idle_waits_for_tracked_tasks() {
        let entry = entry(1);
        let guard = entry.track_task();
        assert_eq!(entry.running_tasks(), 1);

        let waiter = {
            let entry = entry.clone();
            tokio::spawn(async move { entry.idle().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(std::time::Duration::from_secs(5), waiter)
            .await
            .expect("idle should resolve")
            .unwrap();
        assert_eq!(entry.running_tasks(), 0);
    }

    #[test]
    fn test_remove_where() {
        let registry = DownloadRegistry::new();
        registry.insert(1, entry(1));
        registry.insert(2, entry(2));
        registry
            .get(2)
            .unwrap()
            .item
            .send_modify(|item| item.status = DownloadStatus::Completed);

        let removed = registry.remove_where(|item| item.is_terminal());
        assert_eq!(removed, 1);
        assert!(registry.contains(1));
        assert!(!registry.contains(2));
    }
}
