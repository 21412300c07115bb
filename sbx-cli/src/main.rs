// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shardbox CLI
//!
//! Inspect and maintain a chunk store kept on a remote file service.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "sbx")]
#[command(author, version, about = "Shardbox - chunk storage on remote file services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List directory contents
    #[command(alias = "dir")]
    Ls {
        /// Directory relative to the storage root
        #[arg(default_value = "")]
        dir: String,

        /// Long format with details
        #[arg(short, long)]
        long: bool,

        /// Human-readable sizes
        #[arg(short = 'H', long)]
        human: bool,
    },

    /// Show file or directory information
    Stat {
        /// Path to inspect
        path: String,
    },

    /// Create directories
    Mkdir {
        /// Directory path(s) to create
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Remove files
    Rm {
        /// Path(s) to remove
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Move or rename a file
    Mv {
        /// Source path
        from: String,

        /// Destination path
        to: String,
    },

    /// Find where a chunk is (or would be) stored
    FindChunk {
        /// Chunk ID in hex
        id: String,

        /// Look for the fossil instead of the live chunk
        #[arg(long)]
        fossil: bool,
    },

    /// List every chunk in the storage
    Chunks {
        /// Human-readable sizes
        #[arg(short = 'H', long)]
        human: bool,
    },

    /// Download a file
    Get {
        /// Remote path
        path: String,

        /// Local destination (defaults to stdout)
        out: Option<PathBuf>,
    },

    /// Upload a local file
    Put {
        /// Local file
        file: PathBuf,

        /// Remote path
        path: String,
    },

    /// Show the storage's capabilities
    Caps,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> sbx_core::SbxResult<()> {
    debug!(config = ?cli.config, "Loading configuration");
    let config = CliConfig::load(cli.config.as_deref())?;
    let storage = commands::open_storage(&config).await?;
    let storage = storage.as_ref();

    match cli.command {
        Commands::Ls { dir, long, human } => commands::ls(storage, &dir, long, human).await,
        Commands::Stat { path } => commands::stat(storage, &path).await,
        Commands::Mkdir { paths } => commands::mkdir(storage, &paths).await,
        Commands::Rm { paths } => commands::rm(storage, &paths).await,
        Commands::Mv { from, to } => commands::mv(storage, &from, &to).await,
        Commands::FindChunk { id, fossil } => commands::find_chunk(storage, &id, fossil).await,
        Commands::Chunks { human } => commands::chunks(storage, human).await,
        Commands::Get { path, out } => commands::get(storage, &path, out.as_deref()).await,
        Commands::Put { file, path } => commands::put(storage, &file, &path).await,
        Commands::Caps => commands::caps(storage).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}
