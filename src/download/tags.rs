// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tag → download ID index.
//!
//! Entries are created on first use and only ever appended to. IDs of
//! downloads that were later cleared stay in the index; callers filter the
//! result against the registry.

use std::collections::HashMap;
use std::sync::RwLock;

use super::types::DownloadId;
use crate::locks::{resilient_read, resilient_write};

#[derive(Debug, Default)]
pub struct TagIndex {
    tags: RwLock<HashMap<String, Vec<DownloadId>>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `id` under every tag in `tags`.
    pub fn insert(&self, id: DownloadId, tags: &[String]) {
        if tags.is_empty() {
            return;
        }
        let mut index = resilient_write(&self.tags);
        for tag in tags {
            let ids = index.entry(tag.clone()).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    /// IDs ever indexed under `tag`, in insertion order.
    pub fn lookup(&self, tag: &str) -> Vec<DownloadId> {
        resilient_read(&self.tags)
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// All known tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = resilient_read(&self.tags).keys().cloned().collect();
        tags.sort();
        tags
    }
}
