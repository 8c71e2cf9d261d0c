// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory transport with scripted resources.
//!
//! Each URL maps to a [`MemoryResource`] describing the bytes it serves, how
//! they are split into pieces, and optionally a gate that releases one piece
//! per permit. Gated resources let callers hold a transfer mid-flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::sync::Semaphore;

use super::{RemoteResource, Transport, TransportError};
use crate::locks::{resilient_read, resilient_write};

/// Scripted content for one URL.
#[derive(Debug, Clone)]
pub struct MemoryResource {
    pieces: Vec<Bytes>,
    declared_len: Option<u64>,
    gate: Option<Arc<Semaphore>>,
    piece_delay: Option<Duration>,
    fail_after: Option<(usize, String)>,
    refuse: Option<TransportError>,
}

impl MemoryResource {
    /// Serve `data` in one piece, advertising its length.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        Self {
            declared_len: Some(data.len() as u64),
            pieces: vec![Bytes::from(data)],
            gate: None,
            piece_delay: None,
            fail_after: None,
            refuse: None,
        }
    }

    /// A resource whose fetch always fails with `error`.
    pub fn refusing(error: TransportError) -> Self {
        let mut resource = Self::new(Vec::new());
        resource.refuse = Some(error);
        resource
    }

    /// Re-split the body into pieces of at most `piece_len` bytes.
    pub fn pieces_of(mut self, piece_len: usize) -> Self {
        let piece_len = piece_len.max(1);
        let data: Vec<u8> = self.pieces.iter().flat_map(|p| p.iter().copied()).collect();
        self.pieces = data
            .chunks(piece_len)
            .map(Bytes::copy_from_slice)
            .collect();
        self
    }

    /// Do not report a content length.
    pub fn without_length(mut self) -> Self {
        self.declared_len = None;
        self
    }

    /// Report `len` as the content length regardless of the real body size.
    pub fn declared_len(mut self, len: u64) -> Self {
        self.declared_len = Some(len);
        self
    }

    /// Each piece waits for one permit from `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Sleep before every piece.
    pub fn piece_delay(mut self, delay: Duration) -> Self {
        self.piece_delay = Some(delay);
        self
    }

    /// Break the body off with `message` after `pieces` pieces.
    pub fn fail_after(mut self, pieces: usize, message: impl Into<String>) -> Self {
        self.fail_after = Some((pieces, message.into()));
        self
    }

    /// Total size of the real body.
    pub fn body_len(&self) -> u64 {
        self.pieces.iter().map(|p| p.len() as u64).sum()
    }

    fn into_stream(self) -> super::ByteStream {
        stream::unfold((0usize, self), |(index, resource)| async move {
            if let Some((after, message)) = &resource.fail_after {
                if *after == index {
                    let error = TransportError::Body(message.clone());
                    return Some((Err(error), (usize::MAX, resource)));
                }
            }
            let piece = resource.pieces.get(index)?.clone();

            if let Some(gate) = resource.gate.clone() {
                match gate.acquire().await {
                    Ok(permit) => permit.forget(),
                    Err(_) => {
                        let error = TransportError::Body("connection closed".to_string());
                        return Some((Err(error), (usize::MAX, resource)));
                    }
                }
            }
            if let Some(delay) = resource.piece_delay {
                tokio::time::sleep(delay).await;
            }

            Some((Ok(piece), (index + 1, resource)))
        })
        .boxed()
    }
}

/// Serves registered [`MemoryResource`]s; unknown URLs fail to connect.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    resources: RwLock<HashMap<String, MemoryResource>>,
    fetches: AtomicUsize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the resource served at `url`.
    pub fn insert(&self, url: impl Into<String>, resource: MemoryResource) {
        resilient_write(&self.resources).insert(url.into(), resource);
    }

    pub fn with(self, url: impl Into<String>, resource: MemoryResource) -> Self {
        self.insert(url, resource);
        self
    }

    /// Number of fetches attempted so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, url: &str) -> Result<RemoteResource, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let resource = resilient_read(&self.resources)
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::Connect(format!("{url}: host unreachable")))?;

        if let Some(error) = resource.refuse.clone() {
            return Err(error);
        }

        Ok(RemoteResource {
            total_len: resource.declared_len,
            body: resource.into_stream(),
        })
    }
}
