// File I/O operations

pub mod csv;
pub mod headers;
pub mod parser;
pub mod xlsx;

pub use parser::TableParser;
pub use xlsx::ExportResult;

use thiserror::Error;

/// A dataset could not be written.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("xlsx write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("dataset too large for xlsx ({rows} rows x {cols} columns)")]
    TooLarge { rows: usize, cols: usize },
}
