// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tagfetch::cli::{run_console, InteractiveInput};
use tagfetch::colors::{RED, RESET};
use tagfetch::config::{config_path, load_config_from, Config};
use tagfetch::download::DownloadManager;
use tagfetch::storage::FsStorage;
use tagfetch::transport::HttpTransport;

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// General error - unspecified error
    pub const ERROR: i32 = 1;
    /// Configuration error - invalid or missing config
    pub const CONFIG: i32 = 78;
}

#[derive(Parser)]
#[command(name = "tagfetch")]
#[command(version, about = "Concurrent download manager with pause, resume and tags")]
#[command(long_about = "tagfetch - concurrent download manager\n\n\
    Start the console:     tagfetch\n\
    Add a download:        add https://example.com/file.iso --tags media\n\
    Watch progress:        list\n\
    Pause / resume:        pause 1, resume 1\n\n\
    Logs go to stderr; set RUST_LOG for fine-grained control.")]
struct Cli {
    /// Config file to use instead of ~/.tagfetch/config.json
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory downloads are saved to when no path is given
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Chunk size in bytes for writes and stop checks
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Quiet mode: only log errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode: debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "tagfetch=debug"
        } else if self.quiet {
            "tagfetch=error"
        } else {
            "tagfetch=warn"
        }
    }

    /// Apply command line overrides on top of the loaded config.
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.download_dir {
            config.download_dir = dir.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
    }
}

fn init_logging(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stderr so log lines do not interleave with console tables
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

fn load_settings(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let path = config_path(cli.config.as_deref())?;
    let mut config = load_config_from(&path)?;
    cli.apply(&mut config);
    tracing::debug!(path = %path.display(), ?config, "Configuration loaded");
    Ok((config, path.parent().map(PathBuf::from)))
}

fn run(config: Config, config_dir: Option<PathBuf>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let _guard = runtime.enter();

    let transport = HttpTransport::from_config(&config).context("Failed to create HTTP client")?;
    let manager = DownloadManager::new(Arc::new(transport), Arc::new(FsStorage::new()))?
        .with_chunk_size(config.effective_chunk_size());
    let mut input = InteractiveInput::new(config_dir)?;

    let result = run_console(&manager, &config, &mut input);
    runtime.block_on(manager.shutdown());
    result
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.default_log_filter());

    let (config, config_dir) = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{RED}[X]{RESET} {:#}", e);
            std::process::exit(exit_codes::CONFIG);
        }
    };

    if let Err(e) = run(config, config_dir) {
        eprintln!("{RED}[X]{RESET} {:#}", e);
        std::process::exit(exit_codes::ERROR);
    }
}
