// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tab completion and hints for console commands.
//!
//! ## Example UX
//!
//! ```text
//! > pa<Tab>
//!   pause <id> - Pause a download
//!
//! > pause <Tab>
//!   1
//!   3
//!
//! > search m<Tab>
//!   search media
//! ```

use std::borrow::Cow;

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hint, Hinter};
use rustyline::validate::Validator;
use rustyline::{Context, Helper, Result};

use crate::colors::{CYAN, GRAY, RESET};

/// What a command's argument completes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    None,
    /// A registered download ID
    Id,
    /// A known tag
    Tag,
}

/// Information about a console command.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// Arguments this command accepts (for display)
    pub args: Option<&'static str>,
    pub arg_kind: ArgKind,
}

impl CommandInfo {
    const fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            description,
            args: None,
            arg_kind: ArgKind::None,
        }
    }

    const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    const fn args(mut self, args: &'static str, kind: ArgKind) -> Self {
        self.args = Some(args);
        self.arg_kind = kind;
        self
    }

    /// Check if this command starts with `input`.
    pub fn matches(&self, input: &str) -> bool {
        let input_lower = input.to_lowercase();
        self.name.starts_with(&input_lower) || self.aliases.iter().any(|a| a.starts_with(&input_lower))
    }

    pub fn exact_match(&self, input: &str) -> bool {
        let input_lower = input.to_lowercase();
        self.name == input_lower || self.aliases.iter().any(|a| *a == input_lower)
    }

    /// Get display string for completion menu and help.
    pub fn display_string(&self) -> String {
        if let Some(args) = self.args {
            format!("{} {} - {}", self.name, args, self.description)
        } else {
            format!("{} - {}", self.name, self.description)
        }
    }
}

/// All console commands.
pub static COMMANDS: &[CommandInfo] = &[
    CommandInfo::new("add", "Add a new download (prompts when no URL is given)")
        .aliases(&["a"])
        .args("<url> [save_path] [--threads N] [--tags a,b]", ArgKind::None),
    CommandInfo::new("pause", "Pause a download").args("<id>", ArgKind::Id),
    CommandInfo::new("resume", "Resume a paused download").args("<id>", ArgKind::Id),
    CommandInfo::new("cancel", "Cancel a download").args("<id>", ArgKind::Id),
    CommandInfo::new("search", "Search downloads by tag").args("<tag>", ArgKind::Tag),
    CommandInfo::new("list", "List all downloads").aliases(&["ls"]),
    CommandInfo::new("show", "Show one download in detail")
        .aliases(&["info"])
        .args("<id>", ArgKind::Id),
    CommandInfo::new("stats", "Count downloads by status"),
    CommandInfo::new("clear", "Forget finished downloads"),
    CommandInfo::new("help", "Show all commands").aliases(&["h", "?"]),
    CommandInfo::new("exit", "Exit tagfetch").aliases(&["quit", "q"]),
];

/// Print the command list.
pub fn show_help() {
    println!();
    println!("{}  Available commands:{}", GRAY, RESET);
    println!();
    for cmd in COMMANDS {
        let args_str = cmd.args.map_or(String::new(), |a| format!(" {}", a));
        println!(
            "  {}{:<8}{}{:<46} {}- {}{}",
            CYAN, cmd.name, RESET, args_str, GRAY, cmd.description, RESET
        );
    }
    println!();
}

/// Completer for command names, download IDs and tags.
#[derive(Debug, Default)]
pub struct TagfetchCompleter {
    ids: Vec<String>,
    tags: Vec<String>,
}

impl TagfetchCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ids(&mut self, ids: Vec<String>) {
        self.ids = ids;
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = tags;
    }

    fn values_for(&self, kind: ArgKind) -> &[String] {
        match kind {
            ArgKind::None => &[],
            ArgKind::Id => &self.ids,
            ArgKind::Tag => &self.tags,
        }
    }

    /// Completions for `line[..pos]`, with the byte offset they replace from.
    fn get_completions(&self, line: &str, pos: usize) -> (usize, Vec<Pair>) {
        let input = &line[..pos];

        match input.split_once(' ') {
            None => (0, self.complete_command(input)),
            Some((command, rest)) => {
                let rest = rest.trim_start();
                if rest.contains(' ') {
                    return (pos, Vec::new());
                }
                let Some(info) = COMMANDS.iter().find(|c| c.exact_match(command)) else {
                    return (pos, Vec::new());
                };
                let pairs = self
                    .values_for(info.arg_kind)
                    .iter()
                    .filter(|v| v.starts_with(rest))
                    .map(|v| Pair {
                        display: v.clone(),
                        replacement: v.clone(),
                    })
                    .collect();
                (pos - rest.len(), pairs)
            }
        }
    }

    fn complete_command(&self, input: &str) -> Vec<Pair> {
        COMMANDS
            .iter()
            .filter(|cmd| cmd.matches(input))
            .map(|cmd| Pair {
                display: cmd.display_string(),
                replacement: format!("{} ", cmd.name),
            })
            .collect()
    }

    /// Get a hint for the current input (shown in dim text).
    fn get_hint(&self, line: &str) -> Option<CommandHint> {
        if line.is_empty() || line.contains(' ') {
            return None;
        }

        let matches: Vec<_> = COMMANDS.iter().filter(|cmd| cmd.name.starts_with(line)).collect();
        if matches.len() != 1 {
            return None;
        }

        let cmd = matches[0];
        let remaining = &cmd.name[line.len()..];
        let hint = match cmd.args {
            Some(args) => format!("{} {}", remaining, args),
            None => remaining.to_string(),
        };
        Some(CommandHint {
            display: hint,
            completion_len: remaining.len(),
        })
    }
}

/// A hint displayed after the cursor in dim text.
///
/// Only the command-name part is inserted on accept; the argument synopsis is display only.
#[derive(Debug, Clone)]
pub struct CommandHint {
    display: String,
    completion_len: usize,
}

impl Hint for CommandHint {
    fn display(&self) -> &str {
        &self.display
    }

    fn completion(&self) -> Option<&str> {
        if self.completion_len == 0 {
            None
        } else {
            Some(&self.display[..self.completion_len])
        }
    }
}

impl Completer for TagfetchCompleter {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Result<(usize, Vec<Pair>)> {
        Ok(self.get_completions(line, pos))
    }
}

impl Hinter for TagfetchCompleter {
    type Hint = CommandHint;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<Self::Hint> {
        // Only show hint if cursor is at end of line
        if pos < line.len() {
            return None;
        }
        self.get_hint(line)
    }
}

impl Highlighter for TagfetchCompleter {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("{}{}{}", GRAY, hint, RESET))
    }
}

impl Validator for TagfetchCompleter {}

impl Helper for TagfetchCompleter {}
