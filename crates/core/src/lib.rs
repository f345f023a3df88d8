//! `econfab-core`: shared data model for the data-to-script pipeline.
//!
//! Pure types: no file, network or runtime dependencies. Every stage of the
//! pipeline hands these values forward by shared reference.

pub mod artifact;
pub mod error;
pub mod input;
pub mod regression;
pub mod role;
pub mod table;

pub use artifact::GeneratedArtifact;
pub use error::{AssemblyError, ConfigError, GenerationError, ParseError};
pub use input::{RawInput, SourceKind};
pub use regression::{RegressionChoices, RegressionSpec, RegressionType};
pub use role::{Role, RoleAssignment};
pub use table::{CanonicalDataset, Cell, ParsedFile, ParsedTable};

/// Number of rows kept in a preview table.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// Cleaning service base URL when none is configured.
pub const DEFAULT_CLEANER_ENDPOINT: &str = "http://localhost:5000";

/// Seconds to wait for the cleaning service.
pub const DEFAULT_CLEANER_TIMEOUT_SECS: u64 = 120;

/// Most files the cleaning service accepts in one upload.
pub const DEFAULT_MAX_FILES: usize = 20;

/// File name of the generated do-file.
pub const DEFAULT_SCRIPT_NAME: &str = "analysis.do";

/// File name of the cleaned dataset export, as imported by the do-file.
pub const DEFAULT_DATASET_NAME: &str = "cleaned_data.xlsx";
