//! Extract command handler

use anyhow::{Result, bail};
use colored::*;
use std::path::PathBuf;

use super::ExtractCommands;
use crate::config::{Config, ExtractConfig, defaults};
use crate::extract::{ColumnLayout, extract_images};
use crate::report::FailurePolicy;

/// Settings after merging flags, config file and defaults
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExtractSettings {
    workbook: PathBuf,
    sheet: String,
    output_dir: PathBuf,
    layout: ColumnLayout,
    policy: FailurePolicy,
}

fn resolve_settings(args: ExtractCommands, config: &ExtractConfig) -> Result<ExtractSettings> {
    let anchor_column = match (args.anchor_column, &config.anchor_column) {
        (Some(col), _) => col,
        (None, Some(spec)) => spec.resolve()?,
        (None, None) => ColumnLayout::DEFAULT_ANCHOR_COLUMN,
    };
    let code_column = match (args.code_column, &config.code_column) {
        (Some(col), _) => col,
        (None, Some(spec)) => spec.resolve()?,
        (None, None) => ColumnLayout::DEFAULT_CODE_COLUMN,
    };

    if anchor_column == code_column {
        bail!("Anchor column and product code column must differ");
    }

    Ok(ExtractSettings {
        workbook: args
            .workbook
            .or_else(|| config.workbook.clone())
            .unwrap_or_else(|| PathBuf::from(defaults::WORKBOOK)),
        sheet: args
            .sheet
            .or_else(|| config.sheet.clone())
            .unwrap_or_else(|| defaults::SHEET.to_string()),
        output_dir: args
            .output_dir
            .or_else(|| config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(defaults::OUTPUT_DIR)),
        layout: ColumnLayout {
            anchor_column,
            code_column,
        },
        policy: FailurePolicy::from_keep_going(args.keep_going),
    })
}

/// Handle the extract-images command
pub fn handle_extract_command(args: ExtractCommands, config: &Config) -> Result<()> {
    let settings = resolve_settings(args, &config.extract)?;

    log::info!(
        "Extracting pictures from '{}' sheet '{}' into {}",
        settings.workbook.display(),
        settings.sheet,
        settings.output_dir.display()
    );

    let report = extract_images(
        &settings.workbook,
        &settings.sheet,
        &settings.output_dir,
        settings.layout,
        settings.policy,
    )?;

    if !report.is_success() {
        for failure in report.failures() {
            eprintln!("{}", failure.to_string().red());
        }
        bail!("{} picture(s) could not be saved", report.failed_count());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ColumnSpec;

    fn args() -> ExtractCommands {
        ExtractCommands {
            workbook: None,
            sheet: None,
            output_dir: None,
            anchor_column: None,
            code_column: None,
            keep_going: false,
        }
    }

    #[test]
    fn test_defaults() {
        let settings = resolve_settings(args(), &ExtractConfig::default()).unwrap();
        assert_eq!(settings.workbook, PathBuf::from("CONTINENTAL WHOLESALE 2.xlsx"));
        assert_eq!(settings.sheet, "Package");
        assert_eq!(settings.output_dir, PathBuf::from("images"));
        assert_eq!(settings.layout, ColumnLayout::default());
        assert_eq!(settings.policy, FailurePolicy::FailFast);
    }

    #[test]
    fn test_flags_override_config() {
        let config = ExtractConfig {
            sheet: Some("FromConfig".to_string()),
            output_dir: Some(PathBuf::from("cfg-images")),
            anchor_column: Some(ColumnSpec::Name("H".to_string())),
            ..Default::default()
        };
        let mut cli = args();
        cli.sheet = Some("FromFlag".to_string());
        cli.keep_going = true;

        let settings = resolve_settings(cli, &config).unwrap();
        assert_eq!(settings.sheet, "FromFlag");
        assert_eq!(settings.output_dir, PathBuf::from("cfg-images"));
        assert_eq!(settings.layout.anchor_column, 7);
        assert_eq!(settings.layout.code_column, 2);
        assert_eq!(settings.policy, FailurePolicy::KeepGoing);
    }

    #[test]
    fn test_same_columns_rejected() {
        let mut cli = args();
        cli.anchor_column = Some(2);
        assert!(resolve_settings(cli, &ExtractConfig::default()).is_err());
    }
}
