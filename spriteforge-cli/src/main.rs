//! Spriteforge CLI - convert videos to sprite sheets and upload them.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{convert, upload};

/// Convert videos to sprite sheets and upload them as assets.
#[derive(Debug, Parser)]
#[command(name = "spriteforge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert videos into sprite sheets, optionally uploading them
    Convert(convert::ConvertArgs),
    /// Upload an existing directory of sheet PNGs
    Upload(upload::UploadArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Convert(args) => convert::run(args).await,
        Commands::Upload(args) => upload::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
