//! `extract-images` command

mod handler;

pub use handler::handle_extract_command;

use clap::Args;
use std::path::PathBuf;

use crate::extract::parse_column;

fn column_arg(value: &str) -> Result<u32, String> {
    parse_column(value).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Args)]
pub struct ExtractCommands {
    /// Workbook to read [default: "CONTINENTAL WHOLESALE 2.xlsx"]
    #[arg(long, value_name = "FILE")]
    pub workbook: Option<PathBuf>,

    /// Sheet holding the product pictures [default: Package]
    #[arg(long)]
    pub sheet: Option<String>,

    /// Directory the PNG files are written to, created if missing [default: images]
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Column pictures must be anchored in, as letter or zero-based index [default: G]
    #[arg(long, value_name = "COLUMN", value_parser = column_arg)]
    pub anchor_column: Option<u32>,

    /// Column holding the product code, as letter or zero-based index [default: C]
    #[arg(long, value_name = "COLUMN", value_parser = column_arg)]
    pub code_column: Option<u32>,

    /// Record failing pictures and continue instead of stopping at the first error
    #[arg(long)]
    pub keep_going: bool,
}
