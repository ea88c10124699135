use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slopvid")]
#[command(author, version, about = "Assemble per-scene images and narration into one MP4")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP assembly server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Assemble a video locally, without the HTTP server
    Assemble {
        /// Metadata JSON file describing scenes, resolution and frame rate
        #[arg(short, long, required = true)]
        metadata: PathBuf,

        /// Scene image, once per scene in order
        #[arg(short, long = "image", required = true)]
        images: Vec<PathBuf>,

        /// Scene narration clip, once per scene in order
        #[arg(short, long = "audio", required = true)]
        audio: Vec<PathBuf>,

        /// Output file (defaults to slop-video-<date>.mp4 in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
