//! Playpack CLI - playpack command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;

/// Playpack - incremental build pipeline for the game catalogue
#[derive(Parser)]
#[command(name = "playpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root containing src/, temp/ and dist/
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every game once with the one-off profile
    Build {
        /// Maximum simultaneously processed files
        #[arg(long)]
        jobs: Option<usize>,

        /// Audio formats to encode (comma separated: none, wav, mp3, ogg)
        #[arg(long, value_delimiter = ',')]
        audio_formats: Option<Vec<String>>,
    },
    /// Rebuild continuously as the source tree changes
    Watch {
        /// Maximum simultaneously processed files
        #[arg(long)]
        jobs: Option<usize>,

        /// Audio formats to encode (comma separated: none, wav, mp3, ogg)
        #[arg(long, value_delimiter = ',')]
        audio_formats: Option<Vec<String>>,

        /// Quiet period before a rebuild, in milliseconds
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            jobs,
            audio_formats,
        } => cmd::build::run(&cli.root, jobs, audio_formats).await,
        Commands::Watch {
            jobs,
            audio_formats,
            debounce_ms,
        } => cmd::watch::run(&cli.root, jobs, audio_formats, debounce_ms).await,
    }
}
