// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Transports fetch remote content as a byte stream.
//!
//! - [`HttpTransport`] talks HTTP(S) through `reqwest`
//!
//! `memory` holds a scripted in-memory transport for tests.

pub mod http;
#[doc(hidden)]
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

pub use http::HttpTransport;

/// Body of a remote resource, delivered piece by piece.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Error types specific to fetching remote content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The server could not be reached.
    #[error("Cannot connect: {0}")]
    Connect(String),
    /// The server answered with a non-success status.
    #[error("Server responded with HTTP {0}")]
    Status(u16),
    /// Connecting or reading timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),
    /// The body broke off or could not be decoded.
    #[error("Error reading response body: {0}")]
    Body(String),
    /// Anything else the transport reports.
    #[error("Network error: {0}")]
    Other(String),
}

/// An opened remote resource.
pub struct RemoteResource {
    /// Content length, if the remote side reported one.
    pub total_len: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for RemoteResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteResource")
            .field("total_len", &self.total_len)
            .finish_non_exhaustive()
    }
}

/// Source of remote content.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open `url`. Fails on connection errors and non-success responses.
    async fn fetch(&self, url: &str) -> Result<RemoteResource, TransportError>;
}
