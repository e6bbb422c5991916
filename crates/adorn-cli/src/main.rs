use adorn_core::{Config, JewelryCategory, OverlayMode};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "adorn", about = "Jewelry try-on over facial landmarks")]
struct Cli {
    /// Config file (TOML); defaults to $ADORN_CONFIG, then built-in defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Jewelry selection shared by the rendering commands.
#[derive(Args, Debug, Clone)]
struct TryOn {
    /// Overlay mode: earring, necklace or none
    #[arg(short, long, default_value = "none")]
    mode: OverlayMode,

    /// Earring catalog number
    #[arg(long)]
    earring: Option<u32>,

    /// Necklace catalog number
    #[arg(long)]
    necklace: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog assets and whether their files exist
    Catalog {
        /// Only list this category
        #[arg(long)]
        category: Option<JewelryCategory>,
    },
    /// Composite jewelry onto one still image and save a snapshot
    Compose {
        /// Input frame image
        #[arg(long)]
        image: PathBuf,
        /// Landmark record (JSON Lines; the first record is used)
        #[arg(long)]
        landmarks: PathBuf,
        #[command(flatten)]
        try_on: TryOn,
        /// Output directory (defaults to snapshot.dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also share the snapshot
        #[arg(long)]
        share: bool,
        /// Share by writing into this directory
        #[arg(long, requires = "share")]
        share_dir: Option<PathBuf>,
    },
    /// Replay a directory of frames against a landmark stream
    Replay {
        /// Directory of frame images, processed in file name order
        #[arg(long)]
        frames: PathBuf,
        /// Landmark stream (JSON Lines, one record per frame)
        #[arg(long)]
        landmarks: PathBuf,
        #[command(flatten)]
        try_on: TryOn,
        /// Directory for composited frames
        #[arg(short, long)]
        out: PathBuf,
        /// Also save a snapshot of the final frame into snapshot.dir
        #[arg(long)]
        snapshot: bool,
    },
    /// Capture from the camera with landmarks streamed from a file or stdin
    Live {
        /// Landmark stream, or "-" for stdin
        #[arg(long, default_value = "-")]
        landmarks: PathBuf,
        #[command(flatten)]
        try_on: TryOn,
        /// Stop after this many frames
        #[arg(long, default_value_t = 300)]
        frames: usize,
        /// Directory for the final snapshot (defaults to snapshot.dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List V4L2 capture devices
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Catalog { category } => commands::catalog(&config, category),
        Commands::Compose {
            image,
            landmarks,
            try_on,
            out,
            share,
            share_dir,
        } => {
            let out = out.unwrap_or_else(|| config.snapshot.dir.clone());
            let share = share.then_some(share_dir);
            commands::compose(&config, &image, &landmarks, &try_on, &out, share)
        }
        Commands::Replay {
            frames,
            landmarks,
            try_on,
            out,
            snapshot,
        } => commands::replay(&config, &frames, &landmarks, &try_on, &out, snapshot),
        Commands::Live {
            landmarks,
            try_on,
            frames,
            out,
        } => {
            let out = out.unwrap_or_else(|| config.snapshot.dir.clone());
            commands::live(&config, &landmarks, &try_on, frames, &out)
        }
        Commands::Devices => {
            commands::devices();
            Ok(())
        }
    }
}
