// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! memshelf CLI
//!
//! Inspects shelf placement, validates configuration, reclaims orphaned
//! locations and runs a multi-process reduction over a shelved value.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

/// shelf - Share large values between worker processes
#[derive(Parser)]
#[command(name = "shelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show where a shelf would be placed
    Info,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },

    /// Remove shelf locations whose owner process has exited
    Reap {
        /// Folders to scan (defaults to the configured roots)
        #[arg(short, long)]
        root: Vec<PathBuf>,
    },

    /// Shelve random values once and sum sliding windows in worker processes
    Reduce {
        /// Number of values
        #[arg(short, long, default_value_t = 100)]
        n: usize,

        /// Window width
        #[arg(short, long, default_value_t = 40)]
        window: usize,

        /// Number of worker processes
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Seed for the generated values
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Resolve a handle and sum the windows starting in [first, last]
    #[command(hide = true)]
    Worker {
        /// Serialized shelf handle
        #[arg(long)]
        handle: String,

        #[arg(long)]
        first: usize,

        #[arg(long)]
        last: usize,

        #[arg(long)]
        window: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Stdout carries command output; logs go to stderr.
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Info => commands::info::execute(config).await,
        Commands::Validate { file } => commands::validate::execute(&file).await,
        Commands::Reap { root } => commands::reap::execute(config, root).await,
        Commands::Reduce {
            n,
            window,
            workers,
            seed,
        } => commands::reduce::execute(config, n, window, workers, seed).await,
        Commands::Worker {
            handle,
            first,
            last,
            window,
        } => commands::worker::execute(&handle, first, last, window).await,
    }
}
