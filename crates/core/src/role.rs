use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Statistical purpose of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Dependent,
    Independent,
    Control,
    FixedEffect,
    Time,
    Id,
    Instrument,
    Weight,
    Cluster,
    #[default]
    Ignore,
}

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Dependent,
        Role::Independent,
        Role::Control,
        Role::FixedEffect,
        Role::Time,
        Role::Id,
        Role::Instrument,
        Role::Weight,
        Role::Cluster,
        Role::Ignore,
    ];

    /// Wire name (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependent => "dependent",
            Self::Independent => "independent",
            Self::Control => "control",
            Self::FixedEffect => "fixed_effect",
            Self::Time => "time",
            Self::Id => "id",
            Self::Instrument => "instrument",
            Self::Weight => "weight",
            Self::Cluster => "cluster",
            Self::Ignore => "ignore",
        }
    }

    /// Human label, as shown next to each column when mapping.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dependent => "Dependent Variable",
            Self::Independent => "Independent Variable",
            Self::Control => "Control Variable",
            Self::FixedEffect => "Fixed Effect",
            Self::Time => "Time Variable",
            Self::Id => "ID Variable",
            Self::Instrument => "Instrumental Variable",
            Self::Weight => "Weight Variable",
            Self::Cluster => "Cluster Variable",
            Self::Ignore => "Ignore",
        }
    }

    /// Roles whose columns may serve as cluster or fixed-effect variables.
    pub fn is_grouping(&self) -> bool {
        matches!(self, Self::Id | Self::FixedEffect)
    }

    /// Roles whose columns may appear in charts.
    pub fn is_plottable(&self) -> bool {
        matches!(self, Self::Dependent | Self::Independent)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// Header → role mapping over a dataset's columns.
///
/// Entries keep the dataset's header order. A complete assignment (as built
/// by the role mapper) holds exactly one role for every header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleAssignment {
    entries: Vec<(String, Role)>,
}

impl RoleAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role of `header`, replacing any previous role.
    pub fn assign(&mut self, header: impl Into<String>, role: Role) {
        let header = header.into();
        match self.entries.iter_mut().find(|(h, _)| *h == header) {
            Some(entry) => entry.1 = role,
            None => self.entries.push((header, role)),
        }
    }

    pub fn with(mut self, header: impl Into<String>, role: Role) -> Self {
        self.assign(header, role);
        self
    }

    pub fn role_of(&self, header: &str) -> Option<Role> {
        self.entries.iter().find(|(h, _)| h == header).map(|(_, r)| *r)
    }

    /// Headers holding `role`, in assignment order.
    pub fn headers_with(&self, role: Role) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(_, r)| *r == role)
            .map(|(h, _)| h.as_str())
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.entries.iter().any(|(_, r)| *r == role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Role)> {
        self.entries.iter().map(|(h, r)| (h.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Role)> for RoleAssignment {
    fn from_iter<I: IntoIterator<Item = (String, Role)>>(iter: I) -> Self {
        let mut assignment = Self::new();
        for (header, role) in iter {
            assignment.assign(header, role);
        }
        assignment
    }
}
