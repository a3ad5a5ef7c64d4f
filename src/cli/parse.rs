//! CLI parse: clap types for darkroom. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// darkroom - gallery catalog sync and site assistant backend
#[derive(Parser)]
#[command(name = "darkroom")]
#[command(about = "Keep the photo gallery catalog in sync with the image pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store credential set (development or production)
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Regenerate the gallery catalog from image metadata
    Update {
        /// Image metadata file (default: gallery.metadata_path)
        #[arg(long)]
        metadata: Option<PathBuf>,
        /// Caption file (default: gallery.captions_path)
        #[arg(long)]
        captions: Option<PathBuf>,
        /// Merge and report without writing to the store
        #[arg(long)]
        dry_run: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Catalog backups
    Backups {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Inspect the live catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// AI caption suggestions
    Captions {
        #[command(subcommand)]
        command: CaptionCommands,
    },
    /// Site assistant transcripts
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },
    /// Consumer price for a print
    Price {
        /// Printing cost before margin and VAT
        #[arg(long)]
        gross: f64,
        /// Use the extra-large margin rate
        #[arg(long)]
        extra_large: bool,
    },
    /// Physical print size for a pixel size
    Dimensions {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Print resolution (default: pricing.dpi)
        #[arg(long)]
        dpi: Option<f64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// List backups, newest first
    List {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the entries of one backup
    Show {
        key: String,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Make a backup the live catalog (the current catalog is backed up first)
    Restore {
        key: String,
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Show the live catalog
    Show {
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Report catalog entries with missing assets and assets with no entry
    Audit {
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CaptionCommands {
    /// Caption every image that has no caption yet
    Generate {
        /// Caption at most this many images
        #[arg(long)]
        limit: Option<usize>,
        /// Requests in flight (default: gallery.caption_concurrency)
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChatCommands {
    /// Send a message as a visitor and print the reply
    Ask {
        #[arg(long)]
        visitor: String,
        message: String,
    },
    /// Show one visitor's transcript
    Show {
        #[arg(long)]
        visitor: String,
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List visitors with a transcript
    List,
}
