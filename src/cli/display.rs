// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Rendering of downloads for the console.
//!
//! Everything here returns a `String` so it can be tested without a terminal.

use std::fmt::Write as _;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::colors::{progress_bar, separator, status_color, BOLD, GRAY, RED, RESET};
use crate::download::types::format_bytes;
use crate::download::{DownloadItem, DownloadStats, DownloadStatus};

/// Width URLs are cut to in the list view.
pub const URL_WIDTH: usize = 30;

const BAR_WIDTH: usize = 20;

/// Cut `text` to at most `max` display columns, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(3);
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

/// Pad `text` with spaces to `width` display columns.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// `ID | URL | progress | status` table, one row per item.
pub fn render_table(items: &[DownloadItem]) -> String {
    if items.is_empty() {
        return format!("{}No downloads.{}\n", GRAY, RESET);
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}{:>4} | {} | {} | Status{}",
        BOLD,
        "ID",
        pad("URL", URL_WIDTH),
        pad("Progress", BAR_WIDTH + 8),
        RESET
    );
    let _ = writeln!(out, "{}", separator(URL_WIDTH + BAR_WIDTH + 32));
    for item in items {
        let _ = writeln!(out, "{}", render_row(item));
    }
    out
}

fn render_row(item: &DownloadItem) -> String {
    let color = status_color(item.status);
    let mut row = format!(
        "{:>4} | {} | {} | {}{}{}",
        item.id,
        pad(&truncate(&item.url, URL_WIDTH), URL_WIDTH),
        progress_bar(item.progress_percent, BAR_WIDTH, color),
        color,
        item.status,
        RESET
    );

    if item.status == DownloadStatus::Downloading {
        if let Some(speed) = item.speed_string() {
            let _ = write!(row, " {}{}", GRAY, speed);
            if let Some(eta) = item.eta_string() {
                let _ = write!(row, ", ETA {}", eta);
            }
            row.push_str(RESET);
        }
    }
    row
}

/// Short `id: url (status)` lines, used for search results.
pub fn render_brief(items: &[DownloadItem]) -> String {
    let mut out = format!("Found {} downloads:\n", items.len());
    for item in items {
        let _ = writeln!(
            out,
            "  {}: {} ({}{}{})",
            item.id,
            item.url,
            status_color(item.status),
            item.status,
            RESET
        );
    }
    out
}

/// Every field of one item.
pub fn render_details(item: &DownloadItem) -> String {
    let mut out = String::new();
    let color = status_color(item.status);
    let _ = writeln!(out, "{}Download {}{}", BOLD, item.id, RESET);
    let _ = writeln!(out, "  URL:       {}", item.url);
    let _ = writeln!(out, "  Save path: {}", item.save_path.display());
    let _ = writeln!(out, "  Status:    {}{}{}", color, item.status, RESET);
    let _ = writeln!(
        out,
        "  Progress:  {} ({} / {})",
        progress_bar(item.progress_percent, BAR_WIDTH, color),
        format_bytes(item.downloaded_bytes),
        if item.total_bytes > 0 {
            format_bytes(item.total_bytes)
        } else {
            "unknown".to_string()
        }
    );
    let _ = writeln!(out, "  Threads:   {}", item.thread_count);
    if !item.tags.is_empty() {
        let _ = writeln!(out, "  Tags:      {}", item.tags.join(", "));
    }
    let _ = writeln!(out, "  Created:   {}", item.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(start) = item.start_time {
        let _ = writeln!(out, "  Started:   {}", start.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(end) = item.end_time {
        let _ = writeln!(out, "  Ended:     {}", end.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(speed) = item.speed_string() {
        let _ = writeln!(out, "  Speed:     {}", speed);
    }
    if let Some(error) = &item.error_message {
        let _ = writeln!(out, "  {}Error:     {}{}", RED, error, RESET);
    }
    out
}

pub fn render_stats(stats: &DownloadStats) -> String {
    let rows = [
        (DownloadStatus::Queued, stats.queued),
        (DownloadStatus::Downloading, stats.downloading),
        (DownloadStatus::Paused, stats.paused),
        (DownloadStatus::Completed, stats.completed),
        (DownloadStatus::Failed, stats.failed),
        (DownloadStatus::Cancelled, stats.cancelled),
    ];

    let mut out = format!("{}Downloads: {}{}\n", BOLD, stats.total(), RESET);
    for (status, count) in rows {
        let _ = writeln!(
            out,
            "  {}{:<12}{} {}",
            status_color(status),
            status.to_string(),
            RESET,
            count
        );
    }
    out
}
