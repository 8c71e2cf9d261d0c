// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for tagfetch.
//!
//! Only [`DownloadError`] ever reaches a caller: it is what the synchronous
//! manager operations return. Everything that goes wrong inside a running
//! transfer is a [`TransferError`], which the worker turns into a `Failed`
//! status plus an error message on the item.

use thiserror::Error;

use crate::download::types::{DownloadId, DownloadStatus};
use crate::storage::StorageError;
use crate::transport::TransportError;

/// Errors returned by [`DownloadManager`](crate::download::DownloadManager) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// The request was malformed; no download was created.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No download with this ID is registered.
    #[error("Download {0} not found")]
    NotFound(DownloadId),

    /// The download exists but is not in a state that allows the operation.
    #[error("Cannot {operation} download {id}: it is {status}")]
    InvalidState {
        id: DownloadId,
        status: DownloadStatus,
        operation: &'static str,
    },

    /// The manager was created outside of a tokio runtime.
    #[error("No tokio runtime available: {0}")]
    Runtime(String),
}

/// Failures inside a transfer. Recorded on the item, never returned.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The body did not match the advertised content length.
    #[error("Expected {expected} bytes but received {received}")]
    LengthMismatch { expected: u64, received: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_message_names_operation_and_status() {
        let err = DownloadError::InvalidState {
            id: 3,
            status: DownloadStatus::Completed,
            operation: "pause",
        };
        assert_eq!(err.to_string(), "Cannot pause download 3: it is Completed");
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err = TransferError::from(TransportError::Status(404));
        assert_eq!(err.to_string(), TransportError::Status(404).to_string());
    }
}
