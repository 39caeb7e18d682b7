//! Column layout of the product sheet
//!
//! Columns are zero-based indices internally. On the command line and in
//! the config file they may be given either as an index ("6") or as a
//! spreadsheet column letter ("G").

use anyhow::{Result, bail};
use serde::Deserialize;

/// Highest column Excel supports (XFD)
const MAX_COLUMN: u32 = 16_383;

/// Which columns hold the pictures and the product codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Column the picture must be anchored in to be exported
    pub anchor_column: u32,
    /// Column holding the product code used as the file name
    pub code_column: u32,
}

impl ColumnLayout {
    pub const DEFAULT_ANCHOR_COLUMN: u32 = 6; // G
    pub const DEFAULT_CODE_COLUMN: u32 = 2; // C
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            anchor_column: Self::DEFAULT_ANCHOR_COLUMN,
            code_column: Self::DEFAULT_CODE_COLUMN,
        }
    }
}

/// Column reference as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    Index(u32),
    Name(String),
}

impl ColumnSpec {
    pub fn resolve(&self) -> Result<u32> {
        match self {
            ColumnSpec::Index(idx) if *idx > MAX_COLUMN => {
                bail!("Column index {} is out of range (max {})", idx, MAX_COLUMN)
            }
            ColumnSpec::Index(idx) => Ok(*idx),
            ColumnSpec::Name(name) => parse_column(name),
        }
    }
}

/// Parse a column given as a zero-based index or as letters.
///
/// "6" -> 6, "G" -> 6, "aa" -> 26
pub fn parse_column(input: &str) -> Result<u32> {
    let input = input.trim();
    if input.is_empty() {
        bail!("Column reference is empty");
    }

    if let Ok(idx) = input.parse::<u32>() {
        return ColumnSpec::Index(idx).resolve();
    }

    let mut number: u32 = 0;
    for ch in input.chars() {
        if !ch.is_ascii_alphabetic() {
            bail!("Invalid column reference '{}'", input);
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        number = number
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .filter(|n| *n <= MAX_COLUMN + 1)
            .ok_or_else(|| anyhow::anyhow!("Column '{}' is out of range", input))?;
    }

    Ok(number - 1)
}

/// Spreadsheet letters for a zero-based column, for log messages
pub fn column_name(mut col: u32) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().collect()
}
