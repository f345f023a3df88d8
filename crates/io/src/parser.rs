// TableParser: uploaded bytes -> RawInput -> ParsedFile / ParsedTable

use std::sync::Arc;

use econfab_core::input::{extension, CSV_SHEET_NAME};
use econfab_core::{ParseError, ParsedFile, ParsedTable, RawInput, SourceKind, DEFAULT_PREVIEW_ROWS};

use crate::{csv, xlsx};

/// Decodes uploaded files into tables.
///
/// Stateless apart from the preview size; every operation is a pure function
/// of the `RawInput` it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableParser {
    preview_rows: usize,
}

impl Default for TableParser {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_ROWS)
    }
}

impl TableParser {
    pub fn new(preview_rows: usize) -> Self {
        Self { preview_rows }
    }

    pub fn preview_rows(&self) -> usize {
        self.preview_rows
    }

    /// Classify a file by extension. Spreadsheets are opened once to list
    /// their sheets; no sheet is decoded yet.
    pub fn read_input(&self, name: &str, bytes: impl Into<Arc<[u8]>>) -> Result<RawInput, ParseError> {
        let bytes: Arc<[u8]> = bytes.into();
        let kind = SourceKind::from_file_name(name).ok_or_else(|| ParseError::UnsupportedExtension {
            source_name: name.to_string(),
            extension: extension(name).map(str::to_string),
        })?;

        if bytes.is_empty() {
            return Err(ParseError::Empty {
                source_name: name.to_string(),
            });
        }

        match kind {
            SourceKind::Csv => Ok(RawInput::csv(name, bytes)),
            SourceKind::Spreadsheet => {
                let sheets = xlsx::sheet_names(name, &bytes)?;
                tracing::debug!(source = name, sheets = sheets.len(), "listed workbook sheets");
                Ok(RawInput::spreadsheet(name, bytes, sheets))
            }
        }
    }

    /// Preview of the first sheet (or the CSV body).
    pub fn preview(&self, raw: &RawInput) -> Result<ParsedFile, ParseError> {
        let sheet = raw.first_sheet().ok_or_else(|| ParseError::Empty {
            source_name: raw.name().to_string(),
        })?;
        self.preview_sheet(raw, sheet)
    }

    /// Switch the active sheet of `file`, decoding only that sheet.
    pub fn select_sheet(&self, raw: &RawInput, file: &ParsedFile, sheet: &str) -> Result<ParsedFile, ParseError> {
        if file.active_sheet == sheet {
            return Ok(file.clone());
        }
        self.preview_sheet(raw, sheet)
    }

    /// Full table of one sheet, for local assembly.
    pub fn parse_full(&self, raw: &RawInput, sheet: &str) -> Result<ParsedTable, ParseError> {
        decode(raw, sheet, None)
    }

    /// Preview tables for every declared sheet, in workbook order.
    pub fn parse_all(&self, raw: &RawInput) -> Result<Vec<ParsedTable>, ParseError> {
        raw.sheet_names()
            .iter()
            .map(|sheet| decode(raw, sheet, Some(self.preview_rows)))
            .collect()
    }

    fn preview_sheet(&self, raw: &RawInput, sheet: &str) -> Result<ParsedFile, ParseError> {
        let preview = decode(raw, sheet, Some(self.preview_rows))?;
        Ok(ParsedFile {
            source_name: raw.name().to_string(),
            sheet_names: raw.sheet_names().to_vec(),
            active_sheet: sheet.to_string(),
            preview,
        })
    }
}

fn decode(raw: &RawInput, sheet: &str, limit: Option<usize>) -> Result<ParsedTable, ParseError> {
    if !raw.has_sheet(sheet) {
        return Err(ParseError::UnknownSheet {
            source_name: raw.name().to_string(),
            sheet: sheet.to_string(),
        });
    }

    match raw.kind() {
        SourceKind::Csv => {
            debug_assert_eq!(sheet, CSV_SHEET_NAME);
            let content = csv::decode_text(raw.bytes());
            let is_tsv = extension(raw.name()).is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
            let delimiter = if is_tsv { b'\t' } else { csv::sniff_delimiter(&content) };
            csv::parse_table(raw.name(), &content, delimiter, limit)
        }
        SourceKind::Spreadsheet => xlsx::read_sheet(raw.name(), raw.bytes(), sheet, limit),
    }
}
