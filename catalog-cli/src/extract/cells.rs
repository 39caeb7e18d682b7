//! Product code lookup from worksheet cells

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use std::path::Path;

/// Cell values of one worksheet
pub struct SheetCells {
    range: Range<Data>,
}

impl SheetCells {
    pub fn load<P: AsRef<Path>>(path: P, sheet_name: &str) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook: Xlsx<_> = open_workbook(path)
            .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

        let range = workbook
            .worksheet_range(sheet_name)
            .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

        Ok(Self { range })
    }

    #[cfg(test)]
    pub fn from_range(range: Range<Data>) -> Self {
        Self { range }
    }

    /// Text of the cell at the zero-based position, `None` when the cell is
    /// empty, blank, an error, or outside the used range
    pub fn text(&self, row: u32, col: u32) -> Option<String> {
        self.range.get_value((row, col)).and_then(cell_text)
    }
}

/// Render a cell the way it should appear in a file name
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => {
            // Codes typed as numbers come back as floats
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Some((*f as i64).to_string())
            } else {
                Some(f.to_string())
            }
        }
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => Some(format!("{}", dt)),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}
