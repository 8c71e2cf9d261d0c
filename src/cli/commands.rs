// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parsing of console input into [`Command`]s.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::DownloadId;

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add` with no URL: ask for the fields interactively
    AddInteractive,
    Add {
        url: String,
        save_path: Option<PathBuf>,
        threads: Option<u32>,
        tags: Vec<String>,
    },
    Pause(DownloadId),
    Resume(DownloadId),
    Cancel(DownloadId),
    Search(String),
    List,
    Show(DownloadId),
    Stats,
    Clear,
    Help,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for available commands.")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a valid download ID")]
    BadId(String),
    #[error("'{0}' is not a valid thread count")]
    BadThreads(String),
}

pub const ADD_USAGE: &str = "add <url> [save_path] [--threads N] [--tags a,b]";

/// Parse one console line. Returns `Ok(None)` for blank input.
pub fn parse_command(input: &str) -> Result<Option<Command>, CommandError> {
    let mut parts = input.split_whitespace();
    let Some(name) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let command = match name.to_lowercase().as_str() {
        "add" | "a" => parse_add(&args)?,
        "pause" => Command::Pause(parse_id(&args, "pause <id>")?),
        "resume" => Command::Resume(parse_id(&args, "resume <id>")?),
        "cancel" => Command::Cancel(parse_id(&args, "cancel <id>")?),
        "show" | "info" => Command::Show(parse_id(&args, "show <id>")?),
        "search" => match args.as_slice() {
            [tag] => Command::Search((*tag).to_string()),
            _ => return Err(CommandError::Usage("search <tag>")),
        },
        "list" | "ls" => Command::List,
        "stats" => Command::Stats,
        "clear" => Command::Clear,
        "help" | "h" | "?" => Command::Help,
        "exit" | "quit" | "q" => Command::Exit,
        _ => return Err(CommandError::Unknown(name.to_string())),
    };
    Ok(Some(command))
}

fn parse_id(args: &[&str], usage: &'static str) -> Result<DownloadId, CommandError> {
    match args {
        [id] => id.parse().map_err(|_| CommandError::BadId((*id).to_string())),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn parse_add(args: &[&str]) -> Result<Command, CommandError> {
    if args.is_empty() {
        return Ok(Command::AddInteractive);
    }

    let mut positional = Vec::new();
    let mut threads = None;
    let mut tags = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "--threads" | "-t" => {
                let value = iter.next().ok_or(CommandError::Usage(ADD_USAGE))?;
                threads = Some(parse_threads(value)?);
            }
            "--tags" => {
                let value = iter.next().ok_or(CommandError::Usage(ADD_USAGE))?;
                tags.extend(split_tags(value));
            }
            flag if flag.starts_with("--threads=") => {
                threads = Some(parse_threads(&flag["--threads=".len()..])?);
            }
            flag if flag.starts_with("--tags=") => {
                tags.extend(split_tags(&flag["--tags=".len()..]));
            }
            flag if flag.starts_with("--") => return Err(CommandError::Usage(ADD_USAGE)),
            value => positional.push(value),
        }
    }

    match positional.as_slice() {
        [url] => Ok(Command::Add {
            url: (*url).to_string(),
            save_path: None,
            threads,
            tags,
        }),
        [url, path] => Ok(Command::Add {
            url: (*url).to_string(),
            save_path: Some(PathBuf::from(path)),
            threads,
            tags,
        }),
        _ => Err(CommandError::Usage(ADD_USAGE)),
    }
}

fn parse_threads(value: &str) -> Result<u32, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::BadThreads(value.to_string()))
}

/// Split a comma separated tag list, dropping blanks.
pub fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("list"), Ok(Some(Command::List)));
        assert_eq!(parse_command("LS"), Ok(Some(Command::List)));
        assert_eq!(parse_command("quit"), Ok(Some(Command::Exit)));
        assert_eq!(parse_command("?"), Ok(Some(Command::Help)));
        assert_eq!(parse_command("pause 3"), Ok(Some(Command::Pause(3))));
        assert_eq!(parse_command("  resume   12 "), Ok(Some(Command::Resume(12))));
        assert_eq!(
            parse_command("search media"),
            Ok(Some(Command::Search("media".to_string())))
        );
    }

    #[test]
    fn test_id_errors() {
        assert_eq!(parse_command("pause"), Err(CommandError::Usage("pause <id>")));
        assert_eq!(
            parse_command("cancel x1"),
            Err(CommandError::BadId("x1".to_string()))
        );
        assert_eq!(parse_command("show -1"), Err(CommandError::BadId("-1".to_string())));
    }

    #[test]
    fn test_add_without_args_prompts() {
        assert_eq!(parse_command("add"), Ok(Some(Command::AddInteractive)));
    }

    #[test]
    fn test_add_with_options() {
        let parsed = parse_command("add http://h/f.iso --tags media -t 2").unwrap();
        assert_eq!(
            parsed,
            Some(Command::Add {
                url: "http://h/f.iso".to_string(),
                save_path: None,
                threads: Some(2),
                tags: vec!["media".to_string()],
            })
        );

        // A space after the comma leaves a third positional behind
        assert_eq!(
            parse_command("add http://h/f.iso /tmp/f.iso --tags media, iso"),
            Err(CommandError::Usage(ADD_USAGE))
        );

        let parsed = parse_command("add http://h/f.iso /tmp/f.iso --threads=4 --tags=media,,iso").unwrap();
        assert_eq!(
            parsed,
            Some(Command::Add {
                url: "http://h/f.iso".to_string(),
                save_path: Some(PathBuf::from("/tmp/f.iso")),
                threads: Some(4),
                tags: vec!["media".to_string(), "iso".to_string()],
            })
        );
    }

    #[test]
    fn test_add_url_only() {
        assert_eq!(
            parse_command("add http://h/f.iso"),
            Ok(Some(Command::Add {
                url: "http://h/f.iso".to_string(),
                save_path: None,
                threads: None,
                tags: vec![],
            }))
        );
    }

    #[test]
    fn test_add_errors() {
        assert_eq!(
            parse_command("add http://h/f --threads"),
            Err(CommandError::Usage(ADD_USAGE))
        );
        assert_eq!(
            parse_command("add http://h/f --threads many"),
            Err(CommandError::BadThreads("many".to_string()))
        );
        assert_eq!(
            parse_command("add http://h/f --force"),
            Err(CommandError::Usage(ADD_USAGE))
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_command("frobnicate 1"),
            Err(CommandError::Unknown("frobnicate".to_string()))
        );
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_tags(" , ").is_empty());
    }
}
