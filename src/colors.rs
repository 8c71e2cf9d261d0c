// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! ANSI color codes for console output
//!
//! Color usage conventions:
//! - RED = Failures
//! - GREEN = Completed downloads, confirmations
//! - YELLOW = Paused downloads, warnings
//! - CYAN = Active downloads, prompts
//! - GRAY = Secondary text

use crate::download::DownloadStatus;

/// Reset all formatting
pub const RESET: &str = "\x1b[0m";

/// Bold text
pub const BOLD: &str = "\x1b[1m";

/// Dimmed/faint text
pub const DIM: &str = "\x1b[2m";

/// Red text (failures)
pub const RED: &str = "\x1b[31m";

/// Green text (success, confirmations)
pub const GREEN: &str = "\x1b[32m";

/// Yellow text (paused, warnings)
pub const YELLOW: &str = "\x1b[33m";

/// Cyan text (active downloads, prompts)
pub const CYAN: &str = "\x1b[36m";

/// Bright black (gray) for subtle secondary text
pub const GRAY: &str = "\x1b[90m";

/// Symbols for feedback
pub mod symbols {
    pub const SUCCESS: &str = "[OK]";
    pub const ERROR: &str = "[X]";
    pub const WARNING: &str = "[!]";
}

/// Color for a download status.
pub fn status_color(status: DownloadStatus) -> &'static str {
    match status {
        DownloadStatus::Queued => GRAY,
        DownloadStatus::Downloading => CYAN,
        DownloadStatus::Paused => YELLOW,
        DownloadStatus::Completed => GREEN,
        DownloadStatus::Failed => RED,
        DownloadStatus::Cancelled => DIM,
    }
}

/// Render a progress bar (Unicode block chars) followed by the percentage.
pub fn progress_bar(percent: f64, width: usize, color: &str) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);

    format!(
        "{}{}{}{} {:>5.1}%",
        color,
        "█".repeat(filled),
        "░".repeat(empty),
        RESET,
        percent
    )
}

/// Render a separator line
pub fn separator(width: usize) -> String {
    format!("{}{}{}", DIM, "─".repeat(width), RESET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_fill() {
        let bar = progress_bar(50.0, 10, CYAN);
        assert_eq!(bar.matches('█').count(), 5);
        assert_eq!(bar.matches('░').count(), 5);
        assert!(bar.ends_with(" 50.0%"));
    }

    #[test]
    fn test_progress_bar_clamps() {
        let bar = progress_bar(140.0, 4, GREEN);
        assert_eq!(bar.matches('█').count(), 4);
        assert!(bar.ends_with("100.0%"));
    }
}
