use thiserror::Error;

use crate::role::Role;

/// A source file could not be decoded into a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'{source_name}': file contains no rows")]
    Empty { source_name: String },

    #[error("'{source_name}': unsupported file type{}", .extension.as_deref().map(|e| format!(" '.{e}'")).unwrap_or_default())]
    UnsupportedExtension {
        source_name: String,
        extension: Option<String>,
    },

    #[error("'{source_name}': {message}")]
    Malformed { source_name: String, message: String },

    #[error("'{source_name}': no sheet named '{sheet}'")]
    UnknownSheet { source_name: String, sheet: String },
}

impl ParseError {
    pub fn source_name(&self) -> &str {
        match self {
            Self::Empty { source_name }
            | Self::UnsupportedExtension { source_name, .. }
            | Self::Malformed { source_name, .. }
            | Self::UnknownSheet { source_name, .. } => source_name,
        }
    }
}

/// The files could not be merged into one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("no files to assemble")]
    NoInputs,

    #[error("{count} files selected; at most {max} can be cleaned together")]
    TooManyFiles { count: usize, max: usize },

    #[error("cleaning service returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("cleaning service unreachable: {0}")]
    Network(String),

    #[error("cleaning service response has no header row")]
    EmptyPayload,

    #[error("cleaning service response is not valid CSV: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("background decoding task failed: {0}")]
    Task(String),
}

/// The regression choices are inconsistent with the columns and roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown regression type '{0}' (expected OLS, IV, FixedEffects, Logit or Probit)")]
    UnknownType(String),

    #[error("clustering is enabled but no cluster variable was chosen")]
    MissingClusterVariable,

    #[error("cluster variable '{header}' {reason}")]
    InvalidClusterVariable { header: String, reason: String },

    #[error("fixed effects regression needs at least one fixed effects variable")]
    EmptyFixedEffects,

    #[error("fixed effects variable '{header}' {reason}")]
    InvalidFixedEffect { header: String, reason: String },
}

/// The artifact cannot be generated from the current role mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("no column is mapped as {0}; map at least one dependent and one independent variable")]
    MissingRole(Role),
}
