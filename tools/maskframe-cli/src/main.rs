//! Maskframe CLI: hide rectangular regions of a video and re-encode it.
//!
//! Usage:
//!   maskframe process <INPUT>    Mask a video and write the result
//!   maskframe preview <INPUT>    Render one masked frame to PNG
//!   maskframe info <INPUT>       Show source video information
//!   maskframe check              Check ffmpeg and encoder availability
//!   maskframe validate <FILE>    Validate a mask plan file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use maskframe_common::config::AppConfig;

mod commands;

use commands::MaskArgs;

#[derive(Parser)]
#[command(
    name = "maskframe",
    about = "Blur, pixelate or black out regions of a video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mask a video and write the re-encoded result
    Process {
        /// Source video file
        input: PathBuf,

        #[command(flatten)]
        masks: MaskArgs,

        /// Output capture rate
        #[arg(long)]
        fps: Option<u32>,

        /// Keep a fallback container instead of re-encoding to MP4
        #[arg(long)]
        no_transcode: bool,

        /// Decode the source at playback speed
        #[arg(long)]
        realtime: bool,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a single masked frame to a PNG file
    Preview {
        /// Source video file
        input: PathBuf,

        /// Timestamp to render, in seconds
        #[arg(long, default_value = "0")]
        at: f64,

        #[command(flatten)]
        masks: MaskArgs,

        /// Draw the translucent mask outlines on top
        #[arg(long)]
        overlay: bool,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show source video information
    Info {
        /// Source video file
        input: PathBuf,
    },

    /// Check ffmpeg availability and supported output containers
    Check,

    /// Validate a mask plan file
    Validate {
        /// Path to the mask plan (JSON)
        path: PathBuf,

        /// Native frame size as WIDTHxHEIGHT
        #[arg(long, conflicts_with = "input")]
        size: Option<String>,

        /// Probe this video for the native frame size
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    maskframe_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Process {
            input,
            masks,
            fps,
            no_transcode,
            realtime,
            output,
        } => {
            commands::process::run(
                &config,
                input,
                masks,
                commands::process::Overrides {
                    fps,
                    no_transcode,
                    realtime,
                },
                output,
            )
            .await
        }
        Commands::Preview {
            input,
            at,
            masks,
            overlay,
            output,
        } => commands::preview::run(&config, input, at, masks, overlay, output).await,
        Commands::Info { input } => commands::info::run(input).await,
        Commands::Check => commands::check::run().await,
        Commands::Validate { path, size, input } => {
            commands::validate::run(&config, path, size, input).await
        }
    }
}
