use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One cell of a table. `Empty` is the explicit missing-value marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Value(String),
}

impl Cell {
    /// Build a cell from raw text. Empty text becomes `Cell::Empty`.
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            Self::Empty
        } else {
            Self::Value(text.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Value(s) => s,
        }
    }

    /// Numeric reading of the cell, if it looks like a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Empty => None,
            Self::Value(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Value the cleaned dataset export stores as a number, or `None` when
    /// the cell is stored as text.
    ///
    /// Notation is normalized (`1.50`, `+5`, `1e3` and `.5` are stored as
    /// 1.5, 5, 1000 and 0.5). Text stays text when the number would lose
    /// information: leading zeros of codes (`007`), integer parts past the
    /// 15 digits a spreadsheet keeps exactly, surrounding whitespace, or
    /// non-finite values.
    pub fn stored_number(&self) -> Option<f64> {
        let Self::Value(text) = self else {
            return None;
        };
        if text.trim() != text {
            return None;
        }
        let digits = text.trim_start_matches(['-', '+']);
        if digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.") {
            return None;
        }
        let n: f64 = text.parse().ok()?;
        if !n.is_finite() || n.trunc().abs() >= 1e15 {
            return None;
        }
        Some(n)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

/// Pad or truncate a record so it has exactly `width` cells.
fn fit_row(mut row: Vec<Cell>, width: usize) -> Vec<Cell> {
    row.resize(width, Cell::Empty);
    row
}

// ---------------------------------------------------------------------------
// ParsedTable
// ---------------------------------------------------------------------------

/// One decoded sheet (or CSV file): a header row plus data rows.
///
/// Rows are stored positionally, aligned to `headers`; a row can never carry
/// a column the header row does not declare. `rows` may be a preview; the
/// full data-row count is kept in `total_rows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTable {
    pub source_name: String,
    pub sheet: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
    total_rows: usize,
}

impl ParsedTable {
    /// Build a table. Each row is padded or truncated to the header width.
    pub fn new(
        source_name: impl Into<String>,
        sheet: impl Into<String>,
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Self {
        let width = headers.len();
        let rows: Vec<Vec<Cell>> = rows.into_iter().map(|r| fit_row(r, width)).collect();
        let total_rows = rows.len();
        Self {
            source_name: source_name.into(),
            sheet: sheet.into(),
            headers,
            rows,
            total_rows,
        }
    }

    /// Record the source's full data-row count when only a prefix was kept.
    pub fn with_total_rows(mut self, total: usize) -> Self {
        self.total_rows = total.max(self.rows.len());
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Data rows in the source, regardless of preview truncation.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn is_preview(&self) -> bool {
        self.rows.len() < self.total_rows
    }

    /// Row `idx` as a header → cell mapping. Empty cells are omitted.
    pub fn record(&self, idx: usize) -> Option<HashMap<&str, &Cell>> {
        let row = self.rows.get(idx)?;
        Some(
            self.headers
                .iter()
                .zip(row)
                .filter(|(_, cell)| !cell.is_empty())
                .map(|(h, cell)| (h.as_str(), cell))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// ParsedFile
// ---------------------------------------------------------------------------

/// Inspection state of one uploaded file: its sheets and the preview of the
/// currently selected one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub source_name: String,
    pub sheet_names: Vec<String>,
    pub active_sheet: String,
    pub preview: ParsedTable,
}

impl ParsedFile {
    pub fn headers(&self) -> &[String] {
        self.preview.headers()
    }

    pub fn is_multi_sheet(&self) -> bool {
        self.sheet_names.len() > 1
    }
}

// ---------------------------------------------------------------------------
// CanonicalDataset
// ---------------------------------------------------------------------------

/// The single header-unified table every later stage works from.
///
/// Every row holds exactly one cell per header; missing values are
/// `Cell::Empty`. The constructors enforce this, so there is no way to build
/// a ragged dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalDataset {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl CanonicalDataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows.into_iter().map(|r| fit_row(r, width)).collect();
        Self { headers, rows }
    }

    /// Local assembly: the full row set of one parsed table.
    pub fn from_table(table: ParsedTable) -> Self {
        Self::new(table.headers, table.rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// True when every non-empty cell of column `idx` is stored as a number,
    /// i.e. statistical software reading the export sees a numeric column.
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        self.rows
            .iter()
            .filter_map(|row| row.get(idx))
            .filter(|cell| !cell.is_empty())
            .all(|cell| cell.stored_number().is_some())
    }

    /// Row `idx` as (header, cell) pairs in header order.
    pub fn record(&self, idx: usize) -> Option<Vec<(&str, &Cell)>> {
        let row = self.rows.get(idx)?;
        Some(self.headers.iter().map(String::as_str).zip(row).collect())
    }
}
