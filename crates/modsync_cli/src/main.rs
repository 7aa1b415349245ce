//! ModSync CLI
//!
//! Command-line tools for inspecting and synchronizing mod trees.
//!
//! # Commands
//!
//! - `hash` - Print the fingerprint of a file
//! - `scan` - Index a game directory and print it as JSON
//! - `diff` - Three-way diff of saved indices
//! - `sync` - Synchronize a game directory with a server

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ModSync command-line tools.
#[derive(Parser)]
#[command(name = "modsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fingerprint of a file
    Hash {
        /// File to fingerprint
        file: PathBuf,
    },

    /// Index a game directory
    Scan {
        /// Game root
        root: PathBuf,

        /// SyncPath to index, relative to the root (repeatable)
        #[arg(short, long = "path", required = true)]
        paths: Vec<String>,

        /// Local exclusion glob (repeatable)
        #[arg(short, long = "exclude")]
        excludes: Vec<String>,

        /// Files hashed at once
        #[arg(short, long, default_value = "8")]
        concurrency: usize,

        /// Write the index here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Three-way diff of saved indices
    Diff {
        /// Index of the local tree
        #[arg(long)]
        local: PathBuf,

        /// Index of the remote tree
        #[arg(long)]
        remote: PathBuf,

        /// Snapshot of the last applied sync
        #[arg(long)]
        previous: Option<PathBuf>,

        /// SyncPaths to compare (defaults to every SyncPath in the remote index)
        #[arg(short, long = "path")]
        paths: Vec<String>,

        /// Treat every SyncPath as enforced
        #[arg(long)]
        enforced: bool,
    },

    /// Synchronize a game directory with a server
    Sync {
        /// Server base URL
        #[arg(short, long, default_value = "http://127.0.0.1:6969")]
        server: String,

        /// Game root
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Delete local files that were removed on the server
        #[arg(long)]
        delete_removed: bool,

        /// Concurrent downloads
        #[arg(short, long, default_value = "8")]
        concurrency: usize,

        /// Show what would change without touching any file
        #[arg(long)]
        dry_run: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Hash { file } => {
            commands::hash::run(&file, &cli.format)?;
        }
        Commands::Scan {
            root,
            paths,
            excludes,
            concurrency,
            output,
        } => {
            commands::scan::run(&root, &paths, &excludes, concurrency, output.as_deref()).await?;
        }
        Commands::Diff {
            local,
            remote,
            previous,
            paths,
            enforced,
        } => {
            commands::diff::run(
                &local,
                &remote,
                previous.as_deref(),
                &paths,
                enforced,
                &cli.format,
            )?;
        }
        Commands::Sync {
            server,
            root,
            delete_removed,
            concurrency,
            dry_run,
        } => {
            let args = commands::sync::SyncArgs {
                server,
                root,
                delete_removed,
                concurrency,
                dry_run,
            };
            commands::sync::run(args, &cli.format).await?;
        }
        Commands::Version => {
            println!("ModSync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("ModSync Core v{}", modsync_core::VERSION);
        }
    }

    Ok(())
}
