// File ingestion: bytes off disk, decoded off the async thread

use std::path::{Path, PathBuf};

use econfab_core::{ParseError, ParsedFile, RawInput};
use econfab_io::TableParser;
use thiserror::Error;

/// An uploaded file together with its current preview.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub raw: RawInput,
    pub parsed: ParsedFile,
}

impl UploadedFile {
    pub fn name(&self) -> &str {
        self.raw.name()
    }

    pub fn active_sheet(&self) -> &str {
        &self.parsed.active_sheet
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot read file: {0}")]
    Read(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("decoding task failed: {0}")]
    Task(String),
}

/// A file that was dropped from the upload, and why.
#[derive(Debug)]
pub struct IngestFailure {
    pub source_name: String,
    pub error: IngestError,
}

/// Outcome of ingesting several files. A failure on one file never
/// prevents the others from being ingested.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub files: Vec<UploadedFile>,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Classify and preview one file's bytes on the blocking pool.
pub async fn ingest_bytes(parser: TableParser, name: String, bytes: Vec<u8>) -> Result<UploadedFile, IngestError> {
    let task = tokio::task::spawn_blocking(move || -> Result<UploadedFile, ParseError> {
        let raw = parser.read_input(&name, bytes)?;
        let parsed = parser.preview(&raw)?;
        Ok(UploadedFile { raw, parsed })
    });
    let file = task.await.map_err(|e| IngestError::Task(e.to_string()))??;
    Ok(file)
}

/// Preview another sheet of `file` on the blocking pool. The file itself is
/// left untouched; the caller decides where the new preview goes.
pub async fn switch_sheet(parser: TableParser, file: &UploadedFile, sheet: &str) -> Result<UploadedFile, IngestError> {
    let (raw, parsed, sheet) = (file.raw.clone(), file.parsed.clone(), sheet.to_string());
    let task = tokio::task::spawn_blocking(move || -> Result<UploadedFile, ParseError> {
        let parsed = parser.select_sheet(&raw, &parsed, &sheet)?;
        Ok(UploadedFile { raw, parsed })
    });
    let file = task.await.map_err(|e| IngestError::Task(e.to_string()))??;
    Ok(file)
}

/// Read and preview every path, in order. Unreadable or undecodable files
/// are reported in `failures` and left out of `files`.
pub async fn ingest_paths(parser: TableParser, paths: &[PathBuf]) -> IngestReport {
    let mut report = IngestReport::default();

    for path in paths {
        let name = display_name(path);
        let result = match tokio::fs::read(path).await {
            Ok(bytes) => ingest_bytes(parser, name.clone(), bytes).await,
            Err(e) => Err(IngestError::Read(e)),
        };

        match result {
            Ok(file) => {
                tracing::debug!(
                    file = %name,
                    sheets = file.parsed.sheet_names.len(),
                    rows = file.parsed.preview.total_rows(),
                    "ingested file"
                );
                report.files.push(file);
            }
            Err(error) => {
                tracing::warn!(file = %name, error = %error, "dropping file");
                report.failures.push(IngestFailure { source_name: name, error });
            }
        }
    }

    tracing::info!(ingested = report.files.len(), dropped = report.failures.len(), "ingestion finished");
    report
}

/// File name used as the source name: the last path component.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
