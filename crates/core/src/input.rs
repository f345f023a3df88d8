use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Declared kind of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Csv,
    Spreadsheet,
}

impl SourceKind {
    /// Classify a file name by its extension. `None` for unsupported files.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = extension(name)?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

/// Extension of a file name, without the dot.
pub fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

/// An uploaded file: name, declared kind, and its bytes.
///
/// Immutable once read. Cloning shares the underlying buffer, so the same
/// input can be previewed locally and sent to the cleaning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput {
    name: String,
    kind: SourceKind,
    bytes: Arc<[u8]>,
    sheet_names: Vec<String>,
}

impl RawInput {
    /// Build a CSV input. CSV files expose a single implicit sheet.
    pub fn csv(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Csv,
            bytes: bytes.into(),
            sheet_names: vec![CSV_SHEET_NAME.to_string()],
        }
    }

    /// Build a spreadsheet input with its ordered sheet names.
    pub fn spreadsheet(
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        sheet_names: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Spreadsheet,
            bytes: bytes.into(),
            sheet_names,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.sheet_names.iter().any(|s| s == sheet)
    }

    /// First declared sheet (the active sheet right after upload).
    pub fn first_sheet(&self) -> Option<&str> {
        self.sheet_names.first().map(String::as_str)
    }
}

/// Sheet name reported for CSV sources.
pub const CSV_SHEET_NAME: &str = "Sheet1";
