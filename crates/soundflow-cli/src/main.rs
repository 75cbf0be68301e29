//! Soundflow CLI - build and play audio node graphs from the command line.

mod commands;
mod patch;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "soundflow")]
#[command(author, version, about = "Soundflow audio graph shell", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a WAV file or a saved patch through the audio graph
    Play(commands::play::PlayArgs),

    /// Run a test tone through the 44.1 kHz / 16-bit profile
    Tone(commands::tone::ToneArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    // Initialize tracing subscriber with env-filter support.
    // Use RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Bridge log macros from dependencies into tracing.
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => commands::play::run(args),
        Commands::Tone(args) => commands::tone::run(args),
    }
}
