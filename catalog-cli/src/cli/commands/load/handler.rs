//! Load command handler

use anyhow::{Result, bail};
use colored::*;
use std::path::PathBuf;

use super::LoadCommands;
use crate::api::constants::DEFAULT_DATABASE;
use crate::api::{ClientOptions, DocumentStore, DryRunStore, Endpoint, FirestoreClient};
use crate::config::{Config, LoadConfig, defaults};
use crate::load::load_csv;
use crate::report::FailurePolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadSettings {
    credentials: PathBuf,
    csv: PathBuf,
    collection: String,
    database: String,
    dry_run: bool,
    policy: FailurePolicy,
}

fn resolve_settings(args: LoadCommands, config: &LoadConfig) -> Result<LoadSettings> {
    let collection = args
        .collection
        .or_else(|| config.collection.clone())
        .unwrap_or_else(|| defaults::COLLECTION.to_string());
    if collection.is_empty() || collection.contains('/') {
        bail!("Invalid collection name '{}'", collection);
    }

    Ok(LoadSettings {
        credentials: args
            .credentials
            .or_else(|| config.credentials.clone())
            .unwrap_or_else(|| PathBuf::from(defaults::CREDENTIALS)),
        csv: args
            .csv
            .or_else(|| config.csv.clone())
            .unwrap_or_else(|| PathBuf::from(defaults::CSV)),
        collection,
        database: args
            .database
            .or_else(|| config.database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        dry_run: args.dry_run,
        policy: FailurePolicy::from_keep_going(args.keep_going),
    })
}

/// Handle the load-csv command
pub async fn handle_load_command(args: LoadCommands, config: &Config) -> Result<()> {
    let settings = resolve_settings(args, &config.load)?;

    let store: Box<dyn DocumentStore> = if settings.dry_run {
        println!("{}", "Dry run: no documents will be created.".dimmed());
        Box::new(DryRunStore::new())
    } else {
        let options = ClientOptions {
            endpoint: Endpoint::from_env(),
            database: settings.database.clone(),
        };
        let client = FirestoreClient::from_credentials_file(&settings.credentials, &options).await?;
        log::info!("Connected to Firestore project {}", client.project_id());
        Box::new(client)
    };

    let report = load_csv(
        store.as_ref(),
        &settings.csv,
        &settings.collection,
        settings.policy,
    )
    .await?;

    if !report.is_success() {
        for failure in report.failures() {
            eprintln!("{}", failure.to_string().red());
        }
        bail!("{} row(s) could not be uploaded", report.failed_count());
    }

    Ok(())
}
