// Dataset assembly: previewed files -> one CanonicalDataset

use econfab_cleaner::Cleaner;
use econfab_core::{AssemblyError, CanonicalDataset, ParseError, RawInput};
use econfab_io::{csv, TableParser};

use crate::ingest::UploadedFile;

pub use econfab_core::DEFAULT_MAX_FILES;

/// Source name given to the table the cleaning service returns.
const CLEANED_SOURCE_NAME: &str = "cleaned.csv";

/// How a dataset gets built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    /// One file, parsed in full on this machine
    Local,
    /// Every file sent to the cleaning service
    Delegated,
}

impl AssemblyMode {
    /// Local for a single file unless cleaning is forced.
    pub fn for_files(count: usize, force_clean: bool) -> Self {
        if count == 1 && !force_clean {
            Self::Local
        } else {
            Self::Delegated
        }
    }
}

/// Builds the canonical dataset, delegating to a [`Cleaner`] when needed.
pub struct DatasetAssembler<C> {
    cleaner: C,
    parser: TableParser,
    max_files: usize,
}

impl<C: Cleaner> DatasetAssembler<C> {
    pub fn new(cleaner: C, parser: TableParser) -> Self {
        Self {
            cleaner,
            parser,
            max_files: DEFAULT_MAX_FILES,
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn cleaner(&self) -> &C {
        &self.cleaner
    }

    /// Assemble `files`. At most one cleaning request is made.
    pub async fn assemble(&self, files: &[UploadedFile], force_clean: bool) -> Result<CanonicalDataset, AssemblyError> {
        if files.is_empty() {
            return Err(AssemblyError::NoInputs);
        }

        match AssemblyMode::for_files(files.len(), force_clean) {
            AssemblyMode::Local => {
                let file = &files[0];
                let (parser, raw, sheet) = (self.parser, file.raw.clone(), file.active_sheet().to_string());
                let table = tokio::task::spawn_blocking(move || parser.parse_full(&raw, &sheet))
                    .await
                    .map_err(|e| AssemblyError::Task(e.to_string()))??;
                let dataset = CanonicalDataset::from_table(table);
                tracing::info!(
                    mode = "local",
                    file = file.name(),
                    rows = dataset.row_count(),
                    columns = dataset.column_count(),
                    "assembled dataset"
                );
                Ok(dataset)
            }
            AssemblyMode::Delegated => {
                if files.len() > self.max_files {
                    return Err(AssemblyError::TooManyFiles {
                        count: files.len(),
                        max: self.max_files,
                    });
                }
                let raws: Vec<RawInput> = files.iter().map(|f| f.raw.clone()).collect();
                let payload = self.cleaner.clean(&raws).await?;
                tracing::debug!(duplicates = payload.duplicate_count(), "duplicate records reported by cleaning service");

                let dataset = parse_primary(&payload.primary)?;
                tracing::info!(
                    mode = "delegated",
                    files = files.len(),
                    rows = dataset.row_count(),
                    columns = dataset.column_count(),
                    "assembled dataset"
                );
                Ok(dataset)
            }
        }
    }
}

/// Parse the primary section as comma-separated text with a header row.
fn parse_primary(primary: &str) -> Result<CanonicalDataset, AssemblyError> {
    if primary.trim().is_empty() {
        return Err(AssemblyError::EmptyPayload);
    }
    match csv::parse_table(CLEANED_SOURCE_NAME, primary, b',', None) {
        Ok(table) => Ok(CanonicalDataset::from_table(table)),
        Err(ParseError::Empty { .. }) => Err(AssemblyError::EmptyPayload),
        Err(e) => Err(AssemblyError::MalformedPayload(e.to_string())),
    }
}
