use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::model::{Diagnostic, Record, SnapshotLayout};

/// First spreadsheet row (1-based) that holds data; rows above it carry the
/// snapshot header and metadata.
const DATA_START_ROW: u32 = 5;

/// Absolute position of the inventory-date metadata cell (G2). Read for
/// logging only, never propagated into records.
const DATE_CELL: (u32, u32) = (1, 6);

const COL_PRODUCT: u32 = 0;
const COL_CATEGORY: u32 = 1;
const COL_INDEX: u32 = 2;
const COL_PURCHASE: u32 = 3;
const COL_QUANTITY: u32 = 4;
const COL_SIZE: u32 = 5;
const COL_SALE: u32 = 6;

/// Diagnostic description for an index cell that does not parse.
pub const INDEX_ERROR: &str = "index conversion error";
/// Diagnostic description for a purchase price cell that does not parse.
pub const PURCHASE_ERROR: &str = "purchase price conversion error";
/// Diagnostic description for a sale price cell that does not parse.
pub const SALE_ERROR: &str = "sale price conversion error";
/// Diagnostic description for a blank category tag in the categorized layout.
pub const MISSING_CATEGORY: &str = "missing category value";

/// Reads one snapshot workbook and produces the accepted records together
/// with the per-cell diagnostics raised while converting them.
///
/// A row is accepted only if its quantity cell is numeric and strictly
/// positive and its product cell is non-empty after trimming. Rejected rows
/// are dropped silently; only accepted rows can raise diagnostics.
pub fn read_snapshot(
    path: &Path,
    layout: SnapshotLayout,
) -> Result<(Vec<Record>, Vec<Diagnostic>)> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ToolError::InvalidWorkbook("workbook has no worksheets".into()))??;

    let source_file = file_label(path);

    if let Some(date_cell) = range.get_value(DATE_CELL) {
        let inventory_date = cell_to_string(Some(date_cell));
        if !inventory_date.is_empty() {
            debug!(file = %source_file, %inventory_date, "snapshot date cell");
        }
    }

    let mut records = Vec::new();
    let mut diagnostics = Vec::new();
    // The used range may not start at A1; resolve cells against its offset so
    // row numbers and coordinates stay absolute.
    let start = range.start().unwrap_or((0, 0));

    for (offset, row) in range.rows().enumerate() {
        let row_num = start.0 + offset as u32 + 1;
        if row_num < DATA_START_ROW {
            continue;
        }
        let cell = |col: u32| -> Option<&DataType> {
            col.checked_sub(start.1)
                .and_then(|idx| row.get(idx as usize))
        };

        let Some(quantity) = numeric_cell(cell(COL_QUANTITY)) else {
            continue;
        };
        if quantity <= 0.0 {
            continue;
        }
        let product = cell_to_string(cell(COL_PRODUCT)).trim().to_string();
        if product.is_empty() {
            continue;
        }

        let (index, issue) = convert_index(cell(COL_INDEX), &source_file, row_num);
        diagnostics.extend(issue);
        let (purchase_price, issue) = convert_price(
            cell(COL_PURCHASE),
            COL_PURCHASE,
            PURCHASE_ERROR,
            &source_file,
            row_num,
        );
        diagnostics.extend(issue);
        let (sale_price, issue) =
            convert_price(cell(COL_SALE), COL_SALE, SALE_ERROR, &source_file, row_num);
        diagnostics.extend(issue);

        let category = if layout.reads_category() {
            let (value, issue) = convert_category(cell(COL_CATEGORY), &source_file, row_num);
            diagnostics.extend(issue);
            Some(value)
        } else {
            None
        };

        records.push(Record {
            product,
            category,
            index,
            purchase_price,
            quantity,
            size: cell_to_string(cell(COL_SIZE)),
            sale_price,
            source_file: source_file.clone(),
        });
    }

    Ok((records, diagnostics))
}

/// Converts the index cell to an integer, truncating toward zero. Failures
/// fall back to 0 and raise a diagnostic; the row itself is kept.
fn convert_index(cell: Option<&DataType>, file: &str, row: u32) -> (i64, Option<Diagnostic>) {
    match cell_to_f64(cell) {
        Some(value) => (value.trunc() as i64, None),
        None => (0, Some(diagnostic(file, row, COL_INDEX, INDEX_ERROR, cell))),
    }
}

/// Converts a price cell to a two-decimal value. Failures fall back to 0.0
/// and raise a diagnostic; the row itself is kept.
fn convert_price(
    cell: Option<&DataType>,
    col: u32,
    description: &str,
    file: &str,
    row: u32,
) -> (f64, Option<Diagnostic>) {
    match cell_to_f64(cell) {
        Some(value) => (round2(value), None),
        None => (0.0, Some(diagnostic(file, row, col, description, cell))),
    }
}

/// Reads the category tag. A blank tag raises a diagnostic but keeps the row,
/// with the empty value left in place.
fn convert_category(cell: Option<&DataType>, file: &str, row: u32) -> (String, Option<Diagnostic>) {
    let value = cell_to_string(cell).trim().to_string();
    if value.is_empty() {
        let issue = diagnostic(file, row, COL_CATEGORY, MISSING_CATEGORY, cell);
        (value, Some(issue))
    } else {
        (value, None)
    }
}

fn diagnostic(
    file: &str,
    row: u32,
    col: u32,
    description: &str,
    cell: Option<&DataType>,
) -> Diagnostic {
    Diagnostic {
        file: file.to_string(),
        row,
        cell: cell_reference(row, col),
        description: description.to_string(),
        value: raw_value(cell),
    }
}

/// Numeric cell value, accepting only genuinely numeric cells. Numeric text
/// does not qualify; the acceptance rule treats it as non-numeric.
fn numeric_cell(cell: Option<&DataType>) -> Option<f64> {
    match cell {
        Some(DataType::Int(value)) => Some(*value as f64),
        Some(DataType::Float(value)) => Some(*value),
        _ => None,
    }
}

/// Numeric interpretation used by the field converters: numeric cells pass
/// through, string cells are parsed as a real number.
fn cell_to_f64(cell: Option<&DataType>) -> Option<f64> {
    match cell {
        Some(DataType::Int(value)) => Some(*value as f64),
        Some(DataType::Float(value)) => Some(*value),
        Some(DataType::String(value)) => {
            value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Raw cell content for diagnostics. Empty cells report no value.
fn raw_value(cell: Option<&DataType>) -> Option<String> {
    match cell {
        Some(DataType::Empty) | None => None,
        Some(value) => Some(cell_to_string(Some(value))),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A1-style reference for an absolute (1-based row, 0-based column) position.
fn cell_reference(row: u32, col: u32) -> String {
    let mut letters = String::new();
    let mut remainder = col;
    loop {
        letters.insert(0, (b'A' + (remainder % 26) as u8) as char);
        remainder /= 26;
        if remainder == 0 {
            break;
        }
        remainder -= 1;
    }
    format!("{letters}{row}")
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_converts_by_truncation() {
        let cell = DataType::Float(12.9);
        let (value, issue) = convert_index(Some(&cell), "a.xlsx", 5);
        assert_eq!(value, 12);
        assert!(issue.is_none());

        let cell = DataType::String("7.5".into());
        let (value, issue) = convert_index(Some(&cell), "a.xlsx", 5);
        assert_eq!(value, 7);
        assert!(issue.is_none());
    }

    #[test]
    fn bad_index_falls_back_to_zero_with_diagnostic() {
        let cell = DataType::String("12A".into());
        let (value, issue) = convert_index(Some(&cell), "a.xlsx", 7);
        assert_eq!(value, 0);
        let issue = issue.expect("diagnostic raised");
        assert_eq!(issue.description, INDEX_ERROR);
        assert_eq!(issue.cell, "C7");
        assert_eq!(issue.value.as_deref(), Some("12A"));
    }

    #[test]
    fn empty_price_reports_no_value() {
        let (value, issue) = convert_price(None, COL_PURCHASE, PURCHASE_ERROR, "a.xlsx", 9);
        assert_eq!(value, 0.0);
        let issue = issue.expect("diagnostic raised");
        assert_eq!(issue.cell, "D9");
        assert_eq!(issue.value, None);
    }

    #[test]
    fn prices_round_to_two_decimals() {
        assert_eq!(round2(19.999), 20.0);
        assert_eq!(round2(49.995), 50.0);
        assert_eq!(round2(10.004), 10.0);
    }

    #[test]
    fn cell_references_use_a1_notation() {
        assert_eq!(cell_reference(5, 0), "A5");
        assert_eq!(cell_reference(12, 6), "G12");
        assert_eq!(cell_reference(1, 26), "AA1");
    }

    #[test]
    fn quantity_strings_are_not_numeric() {
        assert_eq!(numeric_cell(Some(&DataType::String("3".into()))), None);
        assert_eq!(numeric_cell(Some(&DataType::Int(3))), Some(3.0));
    }
}
