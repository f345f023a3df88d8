use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Estimation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RegressionType {
    #[default]
    #[serde(rename = "OLS")]
    Ols,
    #[serde(rename = "IV")]
    Iv,
    FixedEffects,
    Logit,
    Probit,
}

impl RegressionType {
    pub const ALL: [RegressionType; 5] = [
        RegressionType::Ols,
        RegressionType::Iv,
        RegressionType::FixedEffects,
        RegressionType::Logit,
        RegressionType::Probit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ols => "OLS",
            Self::Iv => "IV",
            Self::FixedEffects => "FixedEffects",
            Self::Logit => "Logit",
            Self::Probit => "Probit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Ols => "OLS (Ordinary Least Squares)",
            Self::Iv => "IV (Instrumental Variables)",
            Self::FixedEffects => "Fixed Effects",
            Self::Logit => "Logit",
            Self::Probit => "Probit",
        }
    }
}

impl fmt::Display for RegressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegressionType {
    type Err = String;

    /// Accepts the five canonical names case-insensitively, plus
    /// `fixed_effects` / `fe`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "ols" => Ok(Self::Ols),
            "iv" => Ok(Self::Iv),
            "fixedeffects" | "fixed_effects" | "fe" => Ok(Self::FixedEffects),
            "logit" => Ok(Self::Logit),
            "probit" => Ok(Self::Probit),
            _ => Err(format!("unknown regression type '{s}'")),
        }
    }
}

/// Raw user choices from the options step, before validation.
///
/// Deserializes from the camelCase JSON the options form produces. Omitted
/// flags read as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegressionChoices {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "robustSE")]
    pub robust_se: Option<bool>,
    pub clustering: Option<bool>,
    pub cluster_variable: Option<String>,
    pub time_trends: Option<bool>,
    pub interactions: Option<bool>,
    pub fixed_effects_variables: Vec<String>,
    pub scatter_plot: Option<bool>,
    pub bar_chart: Option<bool>,
}

impl Default for RegressionChoices {
    fn default() -> Self {
        Self {
            kind: RegressionType::Ols.as_str().to_string(),
            robust_se: None,
            clustering: None,
            cluster_variable: None,
            time_trends: None,
            interactions: None,
            fixed_effects_variables: Vec::new(),
            scatter_plot: None,
            bar_chart: None,
        }
    }
}

/// A validated regression configuration.
///
/// Built by the regression configurator, which guarantees:
/// - `cluster_variable` is set iff `clustering`, and names an `id` or
///   `fixed_effect` column;
/// - `fixed_effects_variables` is non-empty only for `FixedEffects`, each
///   entry an `id` or `fixed_effect` column, without duplicates, in header
///   order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionSpec {
    #[serde(rename = "type")]
    pub kind: RegressionType,
    #[serde(rename = "robustSE")]
    pub robust_se: bool,
    pub clustering: bool,
    pub cluster_variable: Option<String>,
    pub time_trends: bool,
    pub interactions: bool,
    pub fixed_effects_variables: Vec<String>,
    pub scatter_plot: bool,
    pub bar_chart: bool,
}

impl RegressionSpec {
    pub fn wants_charts(&self) -> bool {
        self.scatter_plot || self.bar_chart
    }
}
