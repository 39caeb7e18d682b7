mod api;
mod cli;
mod config;
mod extract;
mod load;
mod report;

use anyhow::Result;
use clap::Parser;

use cli::commands::{extract::handle_extract_command, load::handle_load_command};
use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::ExtractImages(args) => handle_extract_command(args, &config),
        Commands::LoadCsv(args) => handle_load_command(args, &config).await,
    }
}
