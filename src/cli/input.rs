// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Line editing for the console.
//!
//! Wraps a rustyline editor with command completion and a history file kept
//! next to the config (`~/.tagfetch/history.txt`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{ColorMode, CompletionType, Config, EditMode, Editor};

use super::completer::TagfetchCompleter;

/// History file name in config directory.
const HISTORY_FILE: &str = "history.txt";

/// Maximum history entries to keep.
const MAX_HISTORY_ENTRIES: usize = 1000;

/// Interactive input handler with tab completion and history.
pub struct InteractiveInput {
    editor: Editor<TagfetchCompleter, DefaultHistory>,
    history_path: Option<PathBuf>,
}

impl InteractiveInput {
    /// Create an input handler whose history lives in `config_dir`.
    pub fn new(config_dir: Option<PathBuf>) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .history_ignore_dups(true)?
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .color_mode(ColorMode::Enabled)
            .auto_add_history(true)
            .max_history_size(MAX_HISTORY_ENTRIES)?
            .build();

        let mut editor = Editor::with_config(config).context("Failed to create input editor")?;
        editor.set_helper(Some(TagfetchCompleter::new()));

        let history_path = history_path(config_dir);
        if let Some(ref path) = history_path {
            if path.exists() {
                let _ = editor.load_history(path);
            }
        }

        Ok(Self {
            editor,
            history_path,
        })
    }

    /// Refresh the IDs and tags offered by tab completion.
    pub fn set_completions(&mut self, ids: Vec<String>, tags: Vec<String>) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.set_ids(ids);
            helper.set_tags(tags);
        }
    }

    /// Read a line of input with the given prompt.
    ///
    /// Returns `Ok(Some(line))` on successful input, `Ok(None)` on EOF (Ctrl+D),
    /// and `Err` on error.
    pub fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                self.save_history();
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C - return empty line to let caller handle it
                Ok(Some(String::new()))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Input error: {}", e)),
        }
    }

    fn save_history(&mut self) {
        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = self.editor.save_history(path);
        }
    }
}

fn history_path(config_dir: Option<PathBuf>) -> Option<PathBuf> {
    config_dir.map(|dir| dir.join(HISTORY_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_path() {
        let path = history_path(Some(PathBuf::from("/home/u/.tagfetch")));
        assert_eq!(path, Some(PathBuf::from("/home/u/.tagfetch/history.txt")));
        assert!(history_path(None).is_none());
    }
}
