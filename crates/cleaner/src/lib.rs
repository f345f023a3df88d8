//! Cleaning service client, shared between the pipeline and the CLI.
//!
//! This crate is the single source of truth for the cleaning service wire
//! contract: multipart upload of raw files, the sectioned text response, and
//! the health check.
//!
//! No retries. No progress reporting.

mod client;
mod payload;

pub use client::{Cleaner, CleanerClient, CleanerError, HealthReport, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use payload::{split_payload, CleanedPayload, AUDIT_MARKER, DUPLICATES_MARKER};
