//! CLI command definitions for the `inkloom` binary.
//!
//! Uses clap derive macros for argument parsing. The surface is small: run
//! a submission file, validate one, or start the server.

pub mod run;
pub mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Workflow execution engine for agent-driven writing pipelines.
#[derive(Parser)]
#[command(name = "inkloom", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (overrides config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config.toml).
        #[arg(long)]
        host: Option<String>,

        /// Data directory (default: ~/.inkloom, or $INKLOOM_DATA_DIR).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Execute a workflow submission file and print its outputs.
    Run {
        /// Path to the submission JSON file.
        file: PathBuf,

        /// Stream agent responses chunk by chunk.
        #[arg(long)]
        stream: bool,

        /// Dispatch independent branches in parallel.
        #[arg(long)]
        parallel: bool,

        /// Data directory (default: ~/.inkloom, or $INKLOOM_DATA_DIR).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Check a workflow submission file for structural problems.
    Validate {
        /// Path to the submission JSON file.
        file: PathBuf,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
