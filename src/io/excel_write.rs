use std::ffi::OsString;
use std::fs;
use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::error::Result;
use crate::model::{AggregateRow, Diagnostic, Record, SnapshotLayout};

/// Sheet holding one row per accepted record.
pub const DETAIL_SHEET: &str = "Detail";
/// Sheet holding one row per aggregate group.
pub const SUMMARY_SHEET: &str = "Summary";
/// Sheet holding the diagnostics export.
pub const ERRORS_SHEET: &str = "Errors";
/// Placeholder rendered for diagnostics whose offending cell was empty.
pub const NO_DATA: &str = "no data";

/// Margin added to the longest rendered value when sizing a column.
const WIDTH_MARGIN: usize = 2;

enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn rendered(&self) -> String {
        match self {
            Cell::Text(value) => value.clone(),
            Cell::Number(value) => value.to_string(),
        }
    }
}

/// Writes the detail and summary sheets for one batch. The summary rows are
/// written in the order given; sorting happens upstream.
pub fn write_report(
    path: &Path,
    records: &[Record],
    summary: &[AggregateRow],
    layout: SnapshotLayout,
) -> Result<()> {
    let mut workbook = Workbook::new();
    let headers = headers(layout);

    let detail_rows: Vec<Vec<Cell>> = records
        .iter()
        .map(|record| record_cells(record, layout))
        .collect();
    write_sheet(&mut workbook, DETAIL_SHEET, &headers, &detail_rows)?;

    let summary_rows: Vec<Vec<Cell>> = summary
        .iter()
        .map(|row| aggregate_cells(row, layout))
        .collect();
    write_sheet(&mut workbook, SUMMARY_SHEET, &headers, &summary_rows)?;

    save_atomic(&mut workbook, path)
}

/// Writes the diagnostics workbook. An empty diagnostic list still produces a
/// header-only sheet.
pub fn write_diagnostics(path: &Path, diagnostics: &[Diagnostic]) -> Result<()> {
    let mut workbook = Workbook::new();
    let headers = vec!["File", "Row", "Cell", "Description", "Value"];

    let rows: Vec<Vec<Cell>> = diagnostics
        .iter()
        .map(|issue| {
            vec![
                Cell::Text(issue.file.clone()),
                Cell::Number(issue.row as f64),
                Cell::Text(issue.cell.clone()),
                Cell::Text(issue.description.clone()),
                Cell::Text(issue.value.clone().unwrap_or_else(|| NO_DATA.to_string())),
            ]
        })
        .collect();
    write_sheet(&mut workbook, ERRORS_SHEET, &headers, &rows)?;

    save_atomic(&mut workbook, path)
}

fn headers(layout: SnapshotLayout) -> Vec<&'static str> {
    let mut headers = vec!["Product"];
    if layout.reads_category() {
        headers.push("Category");
    }
    headers.extend(["Index", "Purchase price", "Qty", "Size", "Sale price", "File"]);
    headers
}

fn record_cells(record: &Record, layout: SnapshotLayout) -> Vec<Cell> {
    let mut cells = vec![Cell::Text(record.product.clone())];
    if layout.reads_category() {
        cells.push(Cell::Text(record.category.clone().unwrap_or_default()));
    }
    cells.extend([
        Cell::Number(record.index as f64),
        Cell::Text(money(record.purchase_price)),
        Cell::Number(record.quantity),
        Cell::Text(record.size.clone()),
        Cell::Text(money(record.sale_price)),
        Cell::Text(record.source_file.clone()),
    ]);
    cells
}

fn aggregate_cells(row: &AggregateRow, layout: SnapshotLayout) -> Vec<Cell> {
    let mut cells = vec![Cell::Text(row.product.clone())];
    if layout.reads_category() {
        cells.push(Cell::Text(row.category.clone().unwrap_or_default()));
    }
    cells.extend([
        Cell::Number(row.index as f64),
        Cell::Text(money(row.purchase_price)),
        Cell::Number(row.quantity),
        Cell::Text(row.size.clone()),
        Cell::Text(money(row.sale_price)),
        Cell::Text(row.files_joined()),
    ]);
    cells
}

/// Monetary values export as fixed two-decimal strings.
fn money(value: f64) -> String {
    format!("{value:.2}")
}

/// Writes one sheet: header row, data rows, then column widths sized to the
/// longest rendered value per column plus a fixed margin.
fn write_sheet(
    workbook: &mut Workbook,
    name: &str,
    headers: &[&str],
    rows: &[Vec<Cell>],
) -> Result<()> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(name)?;

    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for (col_idx, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, *header)?;
    }

    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(value) => {
                    worksheet.write_string((row_idx + 1) as u32, col_idx as u16, value)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number((row_idx + 1) as u32, col_idx as u16, *value)?;
                }
            }
            let rendered = cell.rendered().chars().count();
            if let Some(width) = widths.get_mut(col_idx) {
                if rendered > *width {
                    *width = rendered;
                }
            }
        }
    }

    for (col_idx, width) in widths.iter().enumerate() {
        worksheet.set_column_width(col_idx as u16, (width + WIDTH_MARGIN) as f64)?;
    }

    Ok(())
}

/// Saves the workbook through a sibling temp file and a rename, so the
/// destination either gets the full new file or keeps its previous content.
fn save_atomic(workbook: &mut Workbook, path: &Path) -> Result<()> {
    let buffer = workbook.save_to_buffer()?;

    let mut tmp_name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("export.xlsx"));
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, &buffer)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error.into());
    }
    Ok(())
}
