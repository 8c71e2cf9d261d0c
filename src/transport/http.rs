// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTTP(S) transport backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Url};

use super::{RemoteResource, Transport, TransportError};
use crate::config::Config;

/// Default timeout for establishing a connection (in seconds).
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Streams response bodies of plain GET requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with default timeouts and user agent.
    pub fn new() -> Result<Self, TransportError> {
        Self::build(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            &format!("tagfetch/{}", env!("CARGO_PKG_VERSION")),
        )
    }

    /// Create a transport using the timeouts and user agent from `config`.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::build(
            Duration::from_secs(config.connect_timeout_secs),
            &config.user_agent,
        )
    }

    fn build(connect_timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<RemoteResource, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "{url}: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        tracing::debug!(url, status = status.as_u16(), length = ?response.content_length(), "Response headers received");

        let total_len = response.content_length();
        let body = response
            .bytes_stream()
            .map(|piece| piece.map_err(|e| map_body_error(&e)))
            .boxed();

        Ok(RemoteResource { total_len, body })
    }
}

fn map_request_error(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_connect() {
        TransportError::Connect(format!("{url}: {e}"))
    } else if e.is_timeout() {
        TransportError::Timeout(format!("{url}: {e}"))
    } else {
        TransportError::Other(e.to_string())
    }
}

fn map_body_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Body(e.to_string())
    }
}
