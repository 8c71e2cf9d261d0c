// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The interactive command loop.

use std::path::{Path, PathBuf};

use anyhow::Result;
use reqwest::Url;

use super::commands::{parse_command, split_tags, Command};
use super::completer::show_help;
use super::display::{render_brief, render_details, render_stats, render_table};
use super::input::InteractiveInput;
use crate::colors::{symbols, CYAN, GREEN, RED, RESET, YELLOW};
use crate::config::Config;
use crate::download::{DownloadManager, DownloadRequest};
use crate::error::DownloadError;

/// File name used when the URL has no usable last path segment.
const FALLBACK_FILE_NAME: &str = "download.bin";

/// What the loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    /// Print the help screen
    Help,
    /// Ask for the fields of a new download
    PromptAdd,
    Exit,
}

/// Executes parsed commands against a manager.
pub struct Console<'a> {
    manager: &'a DownloadManager,
    config: &'a Config,
}

impl<'a> Console<'a> {
    pub fn new(manager: &'a DownloadManager, config: &'a Config) -> Self {
        Self { manager, config }
    }

    pub fn execute(&self, command: Command) -> Result<Reply, DownloadError> {
        let reply = match command {
            Command::AddInteractive => Reply::PromptAdd,
            Command::Add {
                url,
                save_path,
                threads,
                tags,
            } => self.add(&url, save_path, threads, tags)?,
            Command::Pause(id) => {
                self.manager.pause(id)?;
                confirm(&format!("Download {} paused", id))
            }
            Command::Resume(id) => {
                self.manager.resume(id)?;
                confirm(&format!("Download {} resumed", id))
            }
            Command::Cancel(id) => {
                self.manager.cancel(id)?;
                confirm(&format!("Download {} cancelled", id))
            }
            Command::Search(tag) => Reply::Output(render_brief(&self.manager.search_by_tag(&tag))),
            Command::List => Reply::Output(render_table(&self.manager.list_all())),
            Command::Show(id) => Reply::Output(render_details(&self.manager.get(id)?)),
            Command::Stats => Reply::Output(render_stats(&self.manager.stats())),
            Command::Clear => {
                let removed = self.manager.clear_finished();
                confirm(&format!("Removed {} finished downloads", removed))
            }
            Command::Help => Reply::Help,
            Command::Exit => Reply::Exit,
        };
        Ok(reply)
    }

    fn add(
        &self,
        url: &str,
        save_path: Option<PathBuf>,
        threads: Option<u32>,
        tags: Vec<String>,
    ) -> Result<Reply, DownloadError> {
        let save_path =
            save_path.unwrap_or_else(|| default_save_path(&self.config.download_dir, url));
        let request = DownloadRequest::new(url, &save_path)
            .threads(threads.unwrap_or(self.config.default_threads))
            .tags(tags);
        let id = self.manager.submit(request)?;
        Ok(confirm(&format!(
            "Download {} added -> {}",
            id,
            save_path.display()
        )))
    }

    /// Ask for URL, save path, threads and tags, then add the download.
    ///
    /// Returns `Ok(None)` if input ended while prompting.
    pub fn add_from_prompts(&self, input: &mut InteractiveInput) -> Result<Option<Reply>> {
        let Some(url) = input.read_line("URL: ")? else {
            return Ok(None);
        };
        let url = url.trim().to_string();
        let Some(path) = input.read_line("Save path: ")? else {
            return Ok(None);
        };
        let Some(threads) = input.read_line(&format!("Threads ({}): ", self.config.default_threads))? else {
            return Ok(None);
        };
        let Some(tags) = input.read_line("Tags (comma separated): ")? else {
            return Ok(None);
        };

        let path = path.trim();
        let save_path = if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        };
        // Unparsable thread counts fall back to the default
        let threads = threads.trim().parse().ok();

        match self.add(&url, save_path, threads, split_tags(&tags)) {
            Ok(reply) => Ok(Some(reply)),
            Err(e) => Ok(Some(failure(&e.to_string()))),
        }
    }
}

/// `<download_dir>/<last URL path segment>`, or a fixed name if the URL has none.
pub fn default_save_path(download_dir: &Path, url: &str) -> PathBuf {
    let name = Url::parse(url.trim())
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .filter(|name| name != "." && name != "..")
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
    download_dir.join(name)
}

fn confirm(message: &str) -> Reply {
    Reply::Output(format!("{}{}{} {}\n", GREEN, symbols::SUCCESS, RESET, message))
}

fn failure(message: &str) -> Reply {
    Reply::Output(format!("{}{} Error:{} {}\n", RED, symbols::ERROR, RESET, message))
}

/// Run the read-execute loop until `exit` or end of input.
pub fn run_console(manager: &DownloadManager, config: &Config, input: &mut InteractiveInput) -> Result<()> {
    let console = Console::new(manager, config);

    println!("{}tagfetch{} download manager. Type 'help' for commands.", CYAN, RESET);

    loop {
        let ids = manager.list_all().iter().map(|item| item.id.to_string()).collect();
        input.set_completions(ids, manager.known_tags());

        let Some(line) = input.read_line("> ")? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}{}{} {}", YELLOW, symbols::WARNING, RESET, e);
                continue;
            }
        };

        let reply = match console.execute(command) {
            Ok(Reply::PromptAdd) => match console.add_from_prompts(input)? {
                Some(reply) => reply,
                None => break,
            },
            Ok(reply) => reply,
            Err(e) => failure(&e.to_string()),
        };

        match reply {
            Reply::Output(text) => print!("{}", text),
            Reply::Help => show_help(),
            Reply::PromptAdd => {}
            Reply::Exit => break,
        }
    }
    Ok(())
}
