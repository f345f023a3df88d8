// Role mapping: complete a partial header -> role mapping, advise on it

use std::fmt;

use econfab_core::{Role, RoleAssignment};
use serde::Serialize;
use thiserror::Error;

/// Complete `prior` over `headers`.
///
/// Every header gets exactly one role: its prior role when one exists,
/// `Ignore` otherwise. Prior entries for headers outside `headers` are
/// dropped. The result follows header order.
pub fn complete(headers: &[String], prior: &RoleAssignment) -> RoleAssignment {
    let dropped = prior.iter().filter(|(h, _)| !headers.iter().any(|x| x == h)).count();
    if dropped > 0 {
        tracing::debug!(dropped, "dropped role entries for unknown headers");
    }

    headers
        .iter()
        .map(|h| (h.clone(), prior.role_of(h).unwrap_or_default()))
        .collect()
}

/// Headers eligible as cluster or fixed-effect variables (`id` or
/// `fixed_effect`), in header order.
pub fn candidates<'a>(headers: &'a [String], assignment: &RoleAssignment) -> Vec<&'a str> {
    headers
        .iter()
        .filter(|h| assignment.role_of(h).is_some_and(|r| r.is_grouping()))
        .map(String::as_str)
        .collect()
}

/// Advisory note about a role assignment. Never blocks progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    NoDependent,
    NoIndependent,
    MultipleDependents { headers: Vec<String> },
    NoInstruments,
    NoGroupingColumns,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDependent => write!(f, "no dependent variable mapped; a script cannot be generated yet"),
            Self::NoIndependent => write!(f, "no independent variable mapped; a script cannot be generated yet"),
            Self::MultipleDependents { headers } => write!(
                f,
                "several dependent variables mapped ({}); only '{}' will be modelled",
                headers.join(", "),
                headers.first().map(String::as_str).unwrap_or_default()
            ),
            Self::NoInstruments => write!(f, "no instrument mapped; IV regression will have no excluded instruments"),
            Self::NoGroupingColumns => write!(f, "no id or fixed_effect column; clustering and fixed effects are unavailable"),
        }
    }
}

/// Advisory notes for `assignment`, in a stable order.
pub fn advise(assignment: &RoleAssignment) -> Vec<Advisory> {
    let mut notes = Vec::new();

    let dependents: Vec<String> = assignment.headers_with(Role::Dependent).map(str::to_string).collect();
    match dependents.len() {
        0 => notes.push(Advisory::NoDependent),
        1 => {}
        _ => notes.push(Advisory::MultipleDependents { headers: dependents }),
    }
    if !assignment.has_role(Role::Independent) {
        notes.push(Advisory::NoIndependent);
    }
    if !assignment.has_role(Role::Instrument) {
        notes.push(Advisory::NoInstruments);
    }
    if !assignment.iter().any(|(_, r)| r.is_grouping()) {
        notes.push(Advisory::NoGroupingColumns);
    }

    notes
}

/// A `HEADER=ROLE` pair could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RolePairError {
    #[error("'{0}' is not of the form HEADER=ROLE")]
    MissingSeparator(String),

    #[error("'{0}': header is empty")]
    EmptyHeader(String),

    #[error("'{header}': unknown role '{role}' (expected one of: {expected})")]
    UnknownRole {
        header: String,
        role: String,
        expected: String,
    },
}

/// Read `HEADER=ROLE` pairs into a (partial) assignment.
///
/// Splits on the last `=`, so headers may themselves contain `=`. A later
/// pair for the same header replaces an earlier one.
pub fn parse_role_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<RoleAssignment, RolePairError> {
    let mut assignment = RoleAssignment::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (header, role) = pair
            .rsplit_once('=')
            .ok_or_else(|| RolePairError::MissingSeparator(pair.to_string()))?;
        let header = header.trim();
        if header.is_empty() {
            return Err(RolePairError::EmptyHeader(pair.to_string()));
        }
        let role: Role = role.parse().map_err(|_| RolePairError::UnknownRole {
            header: header.to_string(),
            role: role.to_string(),
            expected: Role::ALL.iter().map(Role::as_str).collect::<Vec<_>>().join(", "),
        })?;
        assignment.assign(header, role);
    }
    Ok(assignment)
}
