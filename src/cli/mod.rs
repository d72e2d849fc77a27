//! CLI Module
//!
//! Command-line front end for rendering audio offline and checking model
//! documents.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// neuralfx - neural amp/effect model processor
#[derive(Parser, Debug)]
#[command(name = "neuralfx")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a mono WAV file through a model bundle
    #[command(name = "process")]
    Process(ProcessArgs),

    /// Print the descriptor of a model document
    #[command(name = "inspect")]
    Inspect {
        /// Model document, or a bundle directory containing model.json
        path: PathBuf,
    },

    /// Find and validate every model document under a directory
    #[command(name = "scan")]
    Scan {
        /// Directory to search
        dir: PathBuf,

        /// Maximum directory depth
        #[arg(long, default_value_t = 4)]
        max_depth: usize,
    },
}

/// Options for `process`
#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// Input WAV file (mono)
    pub input: PathBuf,

    /// Output WAV file
    pub output: PathBuf,

    /// Bundle directory holding the model document
    #[arg(short, long)]
    pub bundle: PathBuf,

    /// Engine configuration (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// First conditioning parameter
    #[arg(long, default_value_t = 0.0)]
    pub param1: f32,

    /// Second conditioning parameter
    #[arg(long, default_value_t = 0.0)]
    pub param2: f32,

    /// Linear master gain
    #[arg(long, default_value_t = 1.0)]
    pub master: f32,

    /// Copy the input instead of running the model
    #[arg(long)]
    pub bypass: bool,

    /// Samples per processing block
    #[arg(long, default_value_t = 256)]
    pub block_size: usize,

    /// Output bit depth: 16, 24 or 32 (float)
    #[arg(long, default_value_t = 24)]
    pub bit_depth: u16,

    /// Render even if the model fails to load
    #[arg(long)]
    pub allow_unloaded: bool,
}
