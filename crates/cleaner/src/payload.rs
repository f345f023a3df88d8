//! Sectioned response body of the cleaning service.
//!
//! ```text
//! <primary CSV>
//! # Duplicate Records
//! <duplicates CSV, possibly empty>
//! # Audit Report
//! <JSON>
//! ```

/// Marker line opening the duplicate-records section.
pub const DUPLICATES_MARKER: &str = "# Duplicate Records";

/// Marker line opening the audit section, which ends the duplicates section.
pub const AUDIT_MARKER: &str = "# Audit Report";

/// Response body split into its sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPayload {
    /// Cleaned table as CSV text, trimmed.
    pub primary: String,
    /// Duplicate records as CSV text, when the section has any content.
    pub duplicates: Option<String>,
}

impl CleanedPayload {
    /// Data records in the duplicates section (header row excluded).
    pub fn duplicate_count(&self) -> usize {
        self.duplicates
            .as_deref()
            .map(|d| d.lines().filter(|l| !l.trim().is_empty()).count().saturating_sub(1))
            .unwrap_or(0)
    }
}

/// Split a response body on the first duplicates marker.
///
/// Everything before the marker, trimmed, is the primary table. A body
/// without the marker is all primary.
pub fn split_payload(body: &str) -> CleanedPayload {
    let Some((primary, rest)) = body.split_once(DUPLICATES_MARKER) else {
        return CleanedPayload {
            primary: body.trim().to_string(),
            duplicates: None,
        };
    };

    let section = match rest.find(AUDIT_MARKER) {
        Some(end) => &rest[..end],
        None => rest,
    };
    let section = section.trim();

    CleanedPayload {
        primary: primary.trim().to_string(),
        duplicates: (!section.is_empty()).then(|| section.to_string()),
    }
}
