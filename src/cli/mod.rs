//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Wardsync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Wardsync - HL7 ADT ingestion and bed-stay reconciliation
#[derive(Parser, Debug)]
#[command(name = "wardsync")]
#[command(version, about, long_about = None)]
#[command(author = "Wardsync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wardsync.toml", env = "WARDSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "WARDSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest one batch of HL7 files from the input directory
    Ingest(commands::ingest::IngestArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the stays and discharges of a visit
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
