// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Interactive console for tagfetch.
//!
//! This module provides:
//! - Command parsing into [`Command`] values
//! - Tab completion of command names, download IDs and tags
//! - Input history management
//! - Table and detail rendering of downloads
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tagfetch::cli::{run_console, InteractiveInput};
//! use tagfetch::config::Config;
//! use tagfetch::download::DownloadManager;
//! use tagfetch::storage::FsStorage;
//! use tagfetch::transport::HttpTransport;
//!
//! let runtime = tokio::runtime::Runtime::new()?;
//! let _guard = runtime.enter();
//!
//! let config = Config::default();
//! let manager = DownloadManager::new(
//!     Arc::new(HttpTransport::from_config(&config)?),
//!     Arc::new(FsStorage::new()),
//! )?;
//! let mut input = InteractiveInput::new(None)?;
//!
//! run_console(&manager, &config, &mut input)?;
//! runtime.block_on(manager.shutdown());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod commands;
pub mod completer;
pub mod console;
pub mod display;
pub mod input;

// Re-export commonly used types
pub use commands::{parse_command, Command, CommandError};
pub use completer::{show_help, CommandInfo, TagfetchCompleter, COMMANDS};
pub use console::{default_save_path, run_console, Console, Reply};
pub use input::InteractiveInput;
