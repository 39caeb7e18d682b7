//! Export pictures embedded in a product sheet as PNG files
//!
//! Pictures anchored in the anchor column are saved as
//! `<output_dir>/<product code>.png`, where the product code is read from the
//! code column of the picture's anchor row. Pictures anchored anywhere else
//! are ignored.

pub mod cells;
pub mod layout;
pub mod package;

pub use cells::SheetCells;
pub use layout::{ColumnLayout, ColumnSpec, column_name, parse_column};
pub use package::{Anchor, SheetPicture, XlsxPackage};

use anyhow::{Context, Result, bail};
use colored::*;
use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};

use crate::report::{FailurePolicy, ItemOutcome, RunReport};

/// Extract every qualifying picture of `sheet_name` into `output_dir`
pub fn extract_images(
    workbook_path: &Path,
    sheet_name: &str,
    output_dir: &Path,
    layout: ColumnLayout,
    policy: FailurePolicy,
) -> Result<RunReport> {
    fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let mut package = XlsxPackage::open(workbook_path)?;
    let pictures = package
        .sheet_pictures(sheet_name)
        .with_context(|| format!("Failed to read pictures of sheet '{}'", sheet_name))?;
    drop(package);

    let cells = SheetCells::load(workbook_path, sheet_name)?;

    log::info!(
        "Found {} picture(s) on '{}', exporting those anchored in column {}",
        pictures.len(),
        sheet_name,
        column_name(layout.anchor_column)
    );

    let mut report = RunReport::new();
    for picture in &pictures {
        let Some(anchor) = picture.anchor else {
            log::debug!("Ignoring absolutely positioned picture {}", picture.media_path);
            continue;
        };
        if anchor.col != layout.anchor_column {
            log::debug!(
                "Ignoring picture {} anchored at {}{}",
                picture.media_path,
                column_name(anchor.col),
                anchor.row + 1
            );
            continue;
        }

        let item = format!("row {}", anchor.row + 1);
        let result = export_picture(picture, anchor, &cells, layout, output_dir);
        report.handle(policy, &item, result)?;
    }

    if report.is_success() {
        println!("{}", "All images saved successfully.".bright_green());
    } else {
        println!(
            "{}",
            format!(
                "{} image(s) saved, {} skipped, {} failed.",
                report.saved_count(),
                report.skipped_count(),
                report.failed_count()
            )
            .yellow()
        );
    }

    Ok(report)
}

fn export_picture(
    picture: &SheetPicture,
    anchor: Anchor,
    cells: &SheetCells,
    layout: ColumnLayout,
    output_dir: &Path,
) -> Result<ItemOutcome> {
    let row_number = anchor.row + 1;
    let item = format!("row {}", row_number);

    let Some(code) = cells.text(anchor.row, layout.code_column) else {
        println!(
            "{}",
            format!("Row {}: product code not found.", row_number).yellow()
        );
        return Ok(ItemOutcome::skipped(item, "product code not found"));
    };

    let file_name = format!("{}.png", code);
    let target = output_path(output_dir, &code)
        .with_context(|| format!("Row {}: cannot save picture", row_number))?;

    let decoded = image::load_from_memory(&picture.data)
        .with_context(|| format!("Failed to decode picture {}", picture.media_path))?;
    decoded
        .save_with_format(&target, ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    println!("{} saved.", file_name.bright_green());
    Ok(ItemOutcome::saved(item, target))
}

/// Path of the PNG for `code`, refusing codes that would escape `output_dir`
fn output_path(output_dir: &Path, code: &str) -> Result<PathBuf> {
    if code == "." || code == ".." || code.contains(['/', '\\', '\0']) {
        bail!("Product code '{}' is not a valid file name", code);
    }
    Ok(output_dir.join(format!("{}.png", code)))
}
