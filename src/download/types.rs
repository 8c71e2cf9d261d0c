// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download types: identity, status and the per-download record.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the manager. Starts at 1, never reused.
pub type DownloadId = u64;

/// Status of a download.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DownloadStatus {
    /// Registered, worker not started yet
    Queued,
    /// Worker is streaming bytes
    Downloading,
    /// Stopped by a pause request; can be resumed
    Paused,
    /// Stream exhausted normally
    Completed,
    /// Transport or storage error
    Failed,
    /// Stopped by a cancel request
    Cancelled,
}

impl DownloadStatus {
    /// Returns true for Completed, Failed and Cancelled.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Failed | DownloadStatus::Cancelled
        )
    }

    /// Returns true while a worker is (or is about to be) running.
    pub fn is_active(&self) -> bool {
        matches!(self, DownloadStatus::Queued | DownloadStatus::Downloading)
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DownloadStatus::Queued => "Queued",
            DownloadStatus::Downloading => "Downloading",
            DownloadStatus::Paused => "Paused",
            DownloadStatus::Completed => "Completed",
            DownloadStatus::Failed => "Failed",
            DownloadStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// A request to download `url` into `save_path`.
#[derive(Debug, Clone, Default)]
pub struct DownloadRequest {
    pub url: String,
    pub save_path: PathBuf,
    pub thread_count: u32,
    pub tags: Vec<String>,
}

impl DownloadRequest {
    /// Create a request with one thread and no tags.
    pub fn new(url: impl Into<String>, save_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            save_path: save_path.into(),
            thread_count: 1,
            tags: Vec::new(),
        }
    }

    pub fn threads(mut self, thread_count: u32) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Snapshot of one download.
///
/// The manager keeps the live copy inside a watch channel; every value handed
/// out by a query is a clone taken under that channel's lock, so the byte
/// counters, percentage and status always belong together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadItem {
    pub id: DownloadId,
    pub url: String,
    pub save_path: PathBuf,
    pub status: DownloadStatus,
    /// 0-100, always 0 while the total is unknown
    pub progress_percent: f64,
    /// 0 if the transport did not report a length
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub error_message: Option<String>,
    /// Requested parallelism. Carried, not honored by the transfer loop.
    pub thread_count: u32,
}

impl DownloadItem {
    /// Create a Queued item. Tags are trimmed, blanks dropped, duplicates collapsed.
    pub fn new(id: DownloadId, request: DownloadRequest) -> Self {
        let mut tags: Vec<String> = Vec::with_capacity(request.tags.len());
        for tag in request.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        Self {
            id,
            url: request.url,
            save_path: request.save_path,
            status: DownloadStatus::Queued,
            progress_percent: 0.0,
            total_bytes: 0,
            downloaded_bytes: 0,
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
            tags,
            error_message: None,
            thread_count: request.thread_count.max(1),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Record `downloaded` bytes and recompute the percentage in one step.
    pub fn record_progress(&mut self, downloaded: u64) {
        self.downloaded_bytes = downloaded;
        self.progress_percent = progress_percent(downloaded, self.total_bytes);
    }

    /// Clear counters and timestamps before a restart from byte zero.
    pub fn reset_transfer(&mut self) {
        self.total_bytes = 0;
        self.downloaded_bytes = 0;
        self.progress_percent = 0.0;
        self.start_time = None;
        self.end_time = None;
        self.error_message = None;
    }

    /// Time spent transferring, up to `end_time` or now.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let start = self.start_time?;
        Some(self.end_time.unwrap_or_else(Utc::now) - start)
    }

    /// Average speed over the whole transfer.
    pub fn average_speed_bps(&self) -> Option<u64> {
        let millis = self.elapsed()?.num_milliseconds();
        if millis <= 0 {
            return None;
        }
        Some((self.downloaded_bytes as f64 / (millis as f64 / 1000.0)) as u64)
    }

    /// Estimated seconds left, if the total and a speed are known.
    pub fn eta_seconds(&self) -> Option<u64> {
        if self.total_bytes == 0 || self.status != DownloadStatus::Downloading {
            return None;
        }
        let speed = self.average_speed_bps().filter(|s| *s > 0)?;
        let remaining = self.total_bytes.saturating_sub(self.downloaded_bytes);
        Some(remaining / speed)
    }

    /// Get formatted speed string.
    pub fn speed_string(&self) -> Option<String> {
        self.average_speed_bps().map(|bps| format!("{}/s", format_bytes(bps)))
    }

    /// Get formatted ETA string.
    pub fn eta_string(&self) -> Option<String> {
        self.eta_seconds().map(|secs| {
            if secs >= 3600 {
                format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
            } else if secs >= 60 {
                format!("{}m {}s", secs / 60, secs % 60)
            } else {
                format!("{}s", secs)
            }
        })
    }
}

/// Percentage of `total` covered by `downloaded`; 0 when the total is unknown.
pub fn progress_percent(downloaded: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (downloaded as f64 / total as f64 * 100.0).min(100.0)
    }
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Count of registered downloads per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    pub queued: usize,
    pub downloading: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl DownloadStats {
    pub fn record(&mut self, status: DownloadStatus) {
        match status {
            DownloadStatus::Queued => self.queued += 1,
            DownloadStatus::Downloading => self.downloading += 1,
            DownloadStatus::Paused => self.paused += 1,
            DownloadStatus::Completed => self.completed += 1,
            DownloadStatus::Failed => self.failed += 1,
            DownloadStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.queued + self.downloading + self.paused + self.completed + self.failed + self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(DownloadStatus::Completed.is_terminal());
        assert!(DownloadStatus::Failed.is_terminal());
        assert!(DownloadStatus::Cancelled.is_terminal());
        assert!(!DownloadStatus::Paused.is_terminal());
        assert!(!DownloadStatus::Downloading.is_terminal());
        assert!(!DownloadStatus::Queued.is_terminal());
    }

    #[test]
    fn test_new_item_normalizes_tags_and_threads() {
        let request = DownloadRequest::new("http://example/file", "/tmp/f")
            .threads(0)
            .tags([" media ", "", "media", "iso"]);
        let item = DownloadItem::new(1, request);

        assert_eq!(item.status, DownloadStatus::Queued);
        assert_eq!(item.tags, vec!["media".to_string(), "iso".to_string()]);
        assert_eq!(item.thread_count, 1);
        assert!(item.end_time.is_none());
    }

    #[test]
    fn test_progress_is_zero_when_total_unknown() {
        let mut item = DownloadItem::new(1, DownloadRequest::new("u", "p"));
        item.record_progress(4096);
        assert_eq!(item.downloaded_bytes, 4096);
        assert_eq!(item.progress_percent, 0.0);
    }

    #[test]
    fn test_progress_tracks_total() {
        let mut item = DownloadItem::new(1, DownloadRequest::new("u", "p"));
        item.total_bytes = 200;
        item.record_progress(50);
        assert_eq!(item.progress_percent, 25.0);
        item.record_progress(200);
        assert_eq!(item.progress_percent, 100.0);
    }

    #[test]
    fn test_reset_transfer_clears_counters() {
        let mut item = DownloadItem::new(1, DownloadRequest::new("u", "p"));
        item.total_bytes = 10;
        item.record_progress(5);
        item.start_time = Some(Utc::now());
        item.end_time = Some(Utc::now());
        item.reset_transfer();

        assert_eq!(item.downloaded_bytes, 0);
        assert_eq!(item.total_bytes, 0);
        assert_eq!(item.progress_percent, 0.0);
        assert!(item.end_time.is_none());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1_048_576), "5.0 MB");
    }

    #[test]
    fn test_stats_total() {
        let mut stats = DownloadStats::default();
        stats.record(DownloadStatus::Completed);
        stats.record(DownloadStatus::Paused);
        stats.record(DownloadStatus::Completed);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.paused, 1);
        assert_eq!(stats.total(), 3);
    }
}
