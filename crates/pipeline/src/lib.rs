//! `econfab-pipeline`: the stages between uploaded files and the artifact.
//!
//! Ingestion reads and previews files off the async thread, the assembler
//! turns the previewed files into one dataset (locally or through the
//! cleaning service), and the wizard sequences every stage.

pub mod assemble;
pub mod ingest;
pub mod wizard;

pub use assemble::{AssemblyMode, DatasetAssembler, DEFAULT_MAX_FILES};
pub use ingest::{ingest_bytes, ingest_paths, switch_sheet, IngestError, IngestFailure, IngestReport, UploadedFile};
pub use wizard::{AssemblyOutcome, AssemblyTicket, Stage, Wizard, WizardError};
