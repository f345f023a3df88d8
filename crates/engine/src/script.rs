// Stata do-file generation
//
// Output is a pure function of (dataset, assignment, spec, dataset file name):
// no timestamps, no random identifiers, no iteration over unordered maps.

use std::fmt::Write as _;

use econfab_core::{
    CanonicalDataset, GeneratedArtifact, GenerationError, RegressionSpec, RegressionType, Role, RoleAssignment,
};

use crate::names::{column_letter, StataNames};

pub use econfab_core::DEFAULT_DATASET_NAME;

const RULE: &str = "* ============================================================";

/// Builds the analysis do-file and pairs it with the dataset it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptGenerator {
    dataset_name: String,
}

impl Default for ScriptGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DATASET_NAME)
    }
}

impl ScriptGenerator {
    /// `dataset_name` is the file the script imports; the cleaned dataset
    /// export must be written under the same name next to the script.
    pub fn new(dataset_name: impl Into<String>) -> Self {
        Self {
            dataset_name: dataset_name.into(),
        }
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    /// Generate the artifact. Fails when no column is mapped `dependent` or
    /// none is mapped `independent`.
    pub fn generate(
        &self,
        dataset: &CanonicalDataset,
        assignment: &RoleAssignment,
        spec: &RegressionSpec,
    ) -> Result<GeneratedArtifact, GenerationError> {
        let plan = Plan::new(dataset, assignment, spec)?;
        let mut out = String::new();

        plan.write_header(&mut out, spec);
        plan.write_import(&mut out, &self.dataset_name, spec);
        plan.write_regression(&mut out, spec);
        plan.write_charts(&mut out, spec);

        tracing::debug!(
            model = %spec.kind,
            bytes = out.len(),
            kept = plan.kept.len(),
            "generated do-file"
        );

        Ok(GeneratedArtifact::new(out, dataset.clone()))
    }
}

/// Suffix of the numeric variable encoded from a string grouping column.
const ENCODED_SUFFIX: &str = "_id";

/// Role-tagged columns resolved to Stata names, in header order.
struct Plan {
    names: StataNames,
    /// (column index, header, role) for every non-ignored column
    kept: Vec<(usize, String, Role)>,
    /// (header, encoded name) for string columns used as panel or factor
    /// variables; `xtset` and `i.` take numeric variables only
    encoded: Vec<(String, String)>,
}

impl Plan {
    fn new(
        dataset: &CanonicalDataset,
        assignment: &RoleAssignment,
        spec: &RegressionSpec,
    ) -> Result<Self, GenerationError> {
        let kept: Vec<(usize, String, Role)> = dataset
            .headers()
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| match assignment.role_of(h).unwrap_or_default() {
                Role::Ignore => None,
                role => Some((idx, h.clone(), role)),
            })
            .collect();

        let names = StataNames::new(dataset.headers());
        let mut encoded: Vec<(String, String)> = Vec::new();
        if spec.kind == RegressionType::FixedEffects {
            for fe in &spec.fixed_effects_variables {
                let is_string = dataset.column_index(fe).is_some_and(|idx| !dataset.is_numeric_column(idx));
                if is_string && !encoded.iter().any(|(h, _)| h == fe) {
                    let taken: Vec<String> = encoded.iter().map(|(_, n)| n.clone()).collect();
                    encoded.push((fe.clone(), names.derive(fe, ENCODED_SUFFIX, &taken)));
                }
            }
        }

        let plan = Self { names, kept, encoded };
        if plan.vars(Role::Dependent).is_empty() {
            return Err(GenerationError::MissingRole(Role::Dependent));
        }
        if plan.vars(Role::Independent).is_empty() {
            return Err(GenerationError::MissingRole(Role::Independent));
        }
        Ok(plan)
    }

    /// Stata names of the columns holding `role`.
    fn vars(&self, role: Role) -> Vec<String> {
        self.kept
            .iter()
            .filter(|(_, _, r)| *r == role)
            .map(|(_, h, _)| self.names.get(h))
            .collect()
    }

    fn first(&self, role: Role) -> Option<String> {
        self.vars(role).into_iter().next()
    }

    /// Name to group by: the encoded variable for string columns.
    fn group_var(&self, header: &str) -> String {
        self.encoded
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| self.names.get(header))
    }

    fn write_header(&self, out: &mut String, spec: &RegressionSpec) {
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "* Regression analysis do-file");
        let _ = writeln!(out, "* Model: {}", spec.kind.description());
        for role in Role::ALL {
            let vars = self.vars(role);
            if !vars.is_empty() {
                let _ = writeln!(out, "* {}: {}", role.label(), vars.join(" "));
            }
        }
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out);
        let _ = writeln!(out, "clear all");
        let _ = writeln!(out, "set more off");
        let _ = writeln!(out);
    }

    fn write_import(&self, out: &mut String, dataset_name: &str, spec: &RegressionSpec) {
        let letters: Vec<String> = self.kept.iter().map(|(idx, _, _)| column_letter(*idx)).collect();
        let names: Vec<String> = self.kept.iter().map(|(_, h, _)| self.names.get(h)).collect();

        let _ = writeln!(out, "* --- Data ---");
        let _ = writeln!(out, "* Columns are read by position and renamed below");
        let _ = writeln!(out, "import excel using \"{}\", cellrange(A2) clear", quote_safe(dataset_name));
        let _ = writeln!(out, "keep {}", letters.join(" "));
        let _ = writeln!(out, "rename ({}) ({})", letters.join(" "), names.join(" "));
        let _ = writeln!(out);

        for ((_, header, role), name) in self.kept.iter().zip(&names) {
            let _ = writeln!(out, "label variable {name} \"{} ({})\"", quote_safe(header), role.label());
        }
        let _ = writeln!(out);

        if !self.encoded.is_empty() {
            let _ = writeln!(out, "* String identifiers as numeric codes");
            for (header, name) in &self.encoded {
                let _ = writeln!(out, "encode {}, gen({name})", self.names.get(header));
            }
            let _ = writeln!(out);
        }

        if spec.kind == RegressionType::FixedEffects {
            if let Some(panel) = spec.fixed_effects_variables.first() {
                let _ = writeln!(out, "* Panel structure");
                let _ = writeln!(out, "xtset {}", self.group_var(panel));
                let _ = writeln!(out);
            }
        }
    }

    fn write_regression(&self, out: &mut String, spec: &RegressionSpec) {
        let dependents = self.vars(Role::Dependent);
        let independents = self.vars(Role::Independent);
        let controls = self.vars(Role::Control);
        let instruments = self.vars(Role::Instrument);

        let _ = writeln!(out, "* --- Regression ---");
        // Plan::new guarantees one of each
        let (Some(depvar), Some(_)) = (dependents.first(), independents.first()) else {
            return;
        };
        if dependents.len() > 1 {
            let _ = writeln!(out, "* Additional dependent variables not modelled: {}", dependents[1..].join(" "));
        }

        // Terms that sit next to the independents
        let mut extra_terms: Vec<String> = Vec::new();
        if spec.interactions {
            if independents.len() >= 2 {
                for (i, a) in independents.iter().enumerate() {
                    for b in &independents[i + 1..] {
                        extra_terms.push(format!("c.{a}#c.{b}"));
                    }
                }
            } else {
                let _ = writeln!(out, "* Interactions requested but fewer than two independent variables are mapped");
            }
        }

        // Exogenous terms after the independents
        let mut exogenous: Vec<String> = controls.clone();
        if spec.time_trends {
            match self.first(Role::Time) {
                Some(time) => exogenous.push(format!("c.{time}")),
                None => {
                    let _ = writeln!(out, "* Time trends requested but no time variable is mapped");
                }
            }
        }
        if spec.kind == RegressionType::FixedEffects {
            for fe in spec.fixed_effects_variables.iter().skip(1) {
                exogenous.push(format!("i.{}", self.group_var(fe)));
            }
        }

        let weight = self.first(Role::Weight).map(|w| {
            // logit/probit do not take analytic weights
            match spec.kind {
                RegressionType::Logit | RegressionType::Probit => format!("[pweight={w}]"),
                _ => format!("[aweight={w}]"),
            }
        });

        let mut options: Vec<String> = Vec::new();
        if spec.kind == RegressionType::FixedEffects {
            options.push("fe".to_string());
        }
        match (&spec.cluster_variable, spec.robust_se) {
            (Some(cluster), _) if spec.clustering => options.push(format!("vce(cluster {})", self.group_var(cluster))),
            (_, true) => options.push("vce(robust)".to_string()),
            _ => {}
        }

        let mut command: Vec<String> = Vec::new();
        match spec.kind {
            RegressionType::Iv => {
                if instruments.is_empty() {
                    let _ = writeln!(out, "* WARNING: IV regression without instruments; map at least one instrument column");
                }
                let mut endogenous = independents.clone();
                endogenous.extend(extra_terms);
                command.push("ivregress 2sls".to_string());
                command.push(depvar.clone());
                command.extend(exogenous);
                command.push(format!("({} = {})", endogenous.join(" "), instruments.join(" ")));
            }
            kind => {
                command.push(
                    match kind {
                        RegressionType::FixedEffects => "xtreg",
                        RegressionType::Logit => "logit",
                        RegressionType::Probit => "probit",
                        _ => "regress",
                    }
                    .to_string(),
                );
                command.push(depvar.clone());
                command.extend(independents.iter().cloned());
                command.extend(extra_terms);
                command.extend(exogenous);
            }
        }
        command.extend(weight);

        let mut line = command.join(" ");
        if !options.is_empty() {
            line.push_str(", ");
            line.push_str(&options.join(" "));
        }
        let _ = writeln!(out, "{line}");
        let _ = writeln!(out);
    }

    fn write_charts(&self, out: &mut String, spec: &RegressionSpec) {
        if !spec.wants_charts() {
            return;
        }
        let dependents = self.vars(Role::Dependent);
        let independents = self.vars(Role::Independent);
        let Some(depvar) = dependents.first() else {
            return;
        };

        let _ = writeln!(out, "* --- Charts ---");
        if spec.scatter_plot {
            for x in &independents {
                let _ = writeln!(out, "scatter {depvar} {x}, title(\"{depvar} vs {x}\")");
                let _ = writeln!(out, "graph export \"scatter_{depvar}_{x}.png\", replace");
            }
        }
        if spec.bar_chart {
            let plotted: Vec<&str> = self
                .kept
                .iter()
                .filter(|(_, _, r)| r.is_plottable())
                .map(|(_, h, _)| h.as_str())
                .collect();
            let vars: Vec<String> = plotted.iter().map(|h| self.names.get(h)).collect();
            let _ = writeln!(out, "graph bar (mean) {}, title(\"Means\")", vars.join(" "));
            let _ = writeln!(out, "graph export \"bar_means.png\", replace");
        }
        let _ = writeln!(out);
    }
}

/// Text safe inside a Stata double-quoted string.
fn quote_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '"' => '\'',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}
