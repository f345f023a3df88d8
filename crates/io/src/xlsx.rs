// Spreadsheet import (xlsx, xlsm, xlsb, xls, ods) and dataset export (xlsx only)
//
// Import is sheet-at-a-time: listing sheet names opens the workbook once, and
// each sheet is decoded only when it is selected.

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use serde::Serialize;

use econfab_core::{CanonicalDataset, Cell, ParseError, ParsedTable};

use crate::headers::normalize_headers;
use crate::ExportError;

/// Sheet name used for the cleaned dataset export.
pub const EXPORT_SHEET_NAME: &str = "Data";

/// Excel's hard row limit (including the header row).
const EXCEL_MAX_ROWS: usize = 1_048_576;

/// Excel's hard column limit.
const EXCEL_MAX_COLS: usize = 16_384;

fn open(source_name: &str, bytes: &[u8]) -> Result<Sheets<Cursor<Vec<u8>>>, ParseError> {
    open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| ParseError::Malformed {
        source_name: source_name.to_string(),
        message: format!("failed to open workbook: {e}"),
    })
}

/// Ordered sheet names of a workbook.
pub fn sheet_names(source_name: &str, bytes: &[u8]) -> Result<Vec<String>, ParseError> {
    let workbook = open(source_name, bytes)?;
    let names = workbook.sheet_names().to_vec();
    if names.is_empty() {
        return Err(ParseError::Empty {
            source_name: source_name.to_string(),
        });
    }
    Ok(names)
}

/// Decode one sheet: first row is the header row, the rest are data rows.
///
/// With `limit`, only the first `limit` data rows are kept; `total_rows`
/// still reports the full count.
pub fn read_sheet(
    source_name: &str,
    bytes: &[u8],
    sheet: &str,
    limit: Option<usize>,
) -> Result<ParsedTable, ParseError> {
    let start_time = Instant::now();
    let mut workbook = open(source_name, bytes)?;

    if !workbook.sheet_names().iter().any(|s| s == sheet) {
        return Err(ParseError::UnknownSheet {
            source_name: source_name.to_string(),
            sheet: sheet.to_string(),
        });
    }

    let range = workbook.worksheet_range(sheet).map_err(|e| ParseError::Malformed {
        source_name: source_name.to_string(),
        message: format!("failed to read sheet '{sheet}': {e}"),
    })?;

    let mut header_row: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut total = 0usize;

    for row in range.rows() {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        if header_row.is_none() {
            header_row = Some(row.iter().map(cell_text).collect());
            continue;
        }
        total += 1;
        if limit.map_or(true, |l| rows.len() < l) {
            rows.push(row.iter().map(|c| Cell::from_text(&cell_text(c))).collect());
        }
    }

    let header_row = header_row.ok_or_else(|| ParseError::Empty {
        source_name: source_name.to_string(),
    })?;

    tracing::debug!(
        source = source_name,
        sheet,
        rows = total,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "decoded sheet"
    );

    Ok(ParsedTable::new(source_name, sheet, normalize_headers(header_row), rows).with_total_rows(total))
}

/// Display text of a spreadsheet cell.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Format nicely: integers without decimals
        Data::Float(n) => format_float(*n),
        Data::Int(n) => n.to_string(),
        // Stored as TRUE/FALSE text, the way spreadsheets display them
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        // Date cells keep their serial number (1900 date system)
        Data::DateTime(dt) => format_float(dt.as_f64()),
        other => other.to_string(),
    }
}

fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Result of a dataset export
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    /// Data rows written (header excluded)
    pub rows_exported: usize,
    /// Non-empty cells written
    pub cells_exported: usize,
    /// Cells written as numbers rather than text
    pub numeric_cells: usize,
    /// Export duration in milliseconds
    pub export_duration_ms: u128,
}

/// Export a dataset to an xlsx file.
pub fn export(dataset: &CanonicalDataset, path: &Path) -> Result<ExportResult, ExportError> {
    let start_time = Instant::now();
    let mut workbook = XlsxWorkbook::new();
    let mut result = fill_workbook(&mut workbook, dataset)?;
    workbook.save(path)?;
    result.export_duration_ms = start_time.elapsed().as_millis();
    Ok(result)
}

fn fill_workbook(workbook: &mut XlsxWorkbook, dataset: &CanonicalDataset) -> Result<ExportResult, ExportError> {
    if dataset.row_count() + 1 > EXCEL_MAX_ROWS || dataset.column_count() > EXCEL_MAX_COLS {
        return Err(ExportError::TooLarge {
            rows: dataset.row_count(),
            cols: dataset.column_count(),
        });
    }

    let worksheet = workbook.add_worksheet().set_name(EXPORT_SHEET_NAME)?;
    let header_format = Format::new().set_bold();

    for (col, header) in dataset.headers().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    let mut result = ExportResult::default();
    for (idx, row) in dataset.rows().iter().enumerate() {
        write_row(worksheet, (idx + 1) as u32, row, &mut result)?;
        result.rows_exported += 1;
    }

    if dataset.column_count() > 0 {
        worksheet.set_freeze_panes(1, 0)?;
    }

    Ok(result)
}

fn write_row(worksheet: &mut Worksheet, row32: u32, row: &[Cell], result: &mut ExportResult) -> Result<(), ExportError> {
    for (col, cell) in row.iter().enumerate() {
        let col16 = col as u16;
        match cell {
            Cell::Empty => {}
            Cell::Value(text) => {
                match cell.stored_number() {
                    Some(n) => {
                        worksheet.write_number(row32, col16, n)?;
                        result.numeric_cells += 1;
                    }
                    None => {
                        worksheet.write_string(row32, col16, text)?;
                    }
                }
                result.cells_exported += 1;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    /// Build a two-sheet workbook in memory.
    fn sample_workbook() -> Vec<u8> {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet().set_name("gdp").unwrap();
        ws.write_string(0, 0, "country").unwrap();
        ws.write_string(0, 1, "year").unwrap();
        ws.write_string(0, 2, "gdp").unwrap();
        for i in 0..15u32 {
            ws.write_string(i + 1, 0, if i % 2 == 0 { "FR" } else { "DE" }).unwrap();
            ws.write_number(i + 1, 1, 2000.0 + i as f64).unwrap();
            ws.write_number(i + 1, 2, 1.25 * i as f64).unwrap();
        }
        let ws = wb.add_worksheet().set_name("notes").unwrap();
        ws.write_string(0, 0, "flag").unwrap();
        ws.write_boolean(1, 0, true).unwrap();
        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn test_sheet_names_in_order() {
        let bytes = sample_workbook();
        assert_eq!(sheet_names("panel.xlsx", &bytes).unwrap(), vec!["gdp", "notes"]);
    }

    #[test]
    fn test_read_sheet_preview() {
        let bytes = sample_workbook();
        let table = read_sheet("panel.xlsx", &bytes, "gdp", Some(10)).unwrap();
        assert_eq!(table.headers(), &["country", "year", "gdp"]);
        assert_eq!(table.rows().len(), 10);
        assert_eq!(table.total_rows(), 15);
        // Integer-valued floats render without decimals
        assert_eq!(table.rows()[0][1].as_str(), "2000");
        assert_eq!(table.rows()[1][2].as_str(), "1.25");
    }

    #[test]
    fn test_read_other_sheet_lazily() {
        let bytes = sample_workbook();
        let table = read_sheet("panel.xlsx", &bytes, "notes", None).unwrap();
        assert_eq!(table.sheet, "notes");
        assert_eq!(table.rows()[0][0].as_str(), "TRUE");
    }

    #[test]
    fn test_unknown_sheet() {
        let bytes = sample_workbook();
        let err = read_sheet("panel.xlsx", &bytes, "missing", None).unwrap_err();
        assert!(matches!(err, ParseError::UnknownSheet { ref sheet, .. } if sheet == "missing"));
    }

    #[test]
    fn test_garbage_bytes_are_malformed() {
        let err = sheet_names("broken.xlsx", b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn test_empty_sheet_is_error() {
        let mut wb = Workbook::new();
        wb.add_worksheet().set_name("blank").unwrap();
        let bytes = wb.save_to_buffer().unwrap();
        let err = read_sheet("blank.xlsx", &bytes, "blank", None).unwrap_err();
        assert!(matches!(err, ParseError::Empty { .. }));
    }

    #[test]
    fn test_export_normalizes_notation_and_keeps_codes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notation.xlsx");
        let values = ["1.50", "+5", "1e3", ".5", "007", "1234567890123456", " 4", "NaN"];
        let ds = CanonicalDataset::new(
            vec!["v".into()],
            values.iter().map(|v| vec![Cell::from_text(v)]).collect(),
        );

        let result = export(&ds, &path).unwrap();
        assert_eq!(result.numeric_cells, 4);

        let bytes = std::fs::read(&path).unwrap();
        let table = read_sheet("notation.xlsx", &bytes, EXPORT_SHEET_NAME, None).unwrap();
        let read: Vec<&str> = table.rows().iter().map(|r| r[0].as_str()).collect();
        assert_eq!(read, vec!["1.5", "5", "1000", "0.5", "007", "1234567890123456", " 4", "NaN"]);
    }

    #[test]
    fn test_export_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cleaned_data.xlsx");
        let ds = CanonicalDataset::new(
            vec!["id".into(), "gdp".into()],
            vec![
                vec![Cell::from_text("007"), Cell::from_text("1.5")],
                vec![Cell::from_text("008"), Cell::Empty],
            ],
        );

        let result = export(&ds, &path).unwrap();
        assert_eq!(result.rows_exported, 2);
        assert_eq!(result.cells_exported, 3);
        assert_eq!(result.numeric_cells, 1);

        let bytes = std::fs::read(&path).unwrap();
        let table = read_sheet("cleaned_data.xlsx", &bytes, EXPORT_SHEET_NAME, None).unwrap();
        assert_eq!(table.headers(), ds.headers());
        assert_eq!(table.rows()[0][0].as_str(), "007");
        assert_eq!(table.rows()[0][1].as_str(), "1.5");
        assert!(table.rows()[1][1].is_empty());
    }
}
