//! `load-csv` command

mod handler;

pub use handler::handle_load_command;

use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct LoadCommands {
    /// Service account JSON key [default: serviceAccountKey.json]
    #[arg(long, value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// CSV file to upload; the first line holds the field names [default: package_list.csv]
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Target collection [default: packages]
    #[arg(long)]
    pub collection: Option<String>,

    /// Firestore database id [default: (default)]
    #[arg(long)]
    pub database: Option<String>,

    /// Print the documents instead of creating them; no credentials needed
    #[arg(long)]
    pub dry_run: bool,

    /// Record failing rows and continue instead of stopping at the first error
    #[arg(long)]
    pub keep_going: bool,
}
