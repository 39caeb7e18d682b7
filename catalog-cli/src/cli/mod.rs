//! Command line interface

pub mod commands;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use commands::extract::ExtractCommands;
use commands::load::LoadCommands;

#[derive(Debug, Parser)]
#[command(name = "catalog-cli", version, about = "Product catalog maintenance utilities")]
pub struct Cli {
    /// Path to a TOML config file (default: ./catalog-cli.toml, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Save pictures from a workbook sheet as <product code>.png files
    ExtractImages(ExtractCommands),
    /// Create one Firestore document per CSV row
    LoadCsv(LoadCommands),
}

impl Cli {
    /// Default log filter for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
