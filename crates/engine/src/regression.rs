// Regression configuration: raw user choices -> validated RegressionSpec

use econfab_core::{ConfigError, RegressionChoices, RegressionSpec, RegressionType, Role, RoleAssignment};

/// Validate `choices` against the dataset headers and role assignment.
///
/// Pure: the same inputs always give the same outcome. Omitted flags are
/// `false`. A cluster variable supplied without `clustering`, or fixed-effect
/// variables supplied for another model, are dropped rather than rejected.
pub fn configure(
    headers: &[String],
    assignment: &RoleAssignment,
    choices: &RegressionChoices,
) -> Result<RegressionSpec, ConfigError> {
    let kind: RegressionType = choices
        .kind
        .parse()
        .map_err(|_| ConfigError::UnknownType(choices.kind.clone()))?;

    let clustering = choices.clustering.unwrap_or(false);
    let cluster_variable = if clustering {
        let header = choices
            .cluster_variable
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingClusterVariable)?;
        check_grouping(headers, assignment, header)
            .map_err(|reason| ConfigError::InvalidClusterVariable { header: header.to_string(), reason })?;
        Some(header.to_string())
    } else {
        None
    };

    let fixed_effects_variables = if kind == RegressionType::FixedEffects {
        if choices.fixed_effects_variables.is_empty() {
            return Err(ConfigError::EmptyFixedEffects);
        }
        for header in &choices.fixed_effects_variables {
            check_grouping(headers, assignment, header)
                .map_err(|reason| ConfigError::InvalidFixedEffect { header: header.clone(), reason })?;
        }
        // Header order, no duplicates
        headers
            .iter()
            .filter(|h| choices.fixed_effects_variables.contains(h))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    Ok(RegressionSpec {
        kind,
        robust_se: choices.robust_se.unwrap_or(false),
        clustering,
        cluster_variable,
        time_trends: choices.time_trends.unwrap_or(false),
        interactions: choices.interactions.unwrap_or(false),
        fixed_effects_variables,
        scatter_plot: choices.scatter_plot.unwrap_or(false),
        bar_chart: choices.bar_chart.unwrap_or(false),
    })
}

/// `Ok` when `header` is a dataset column with role `id` or `fixed_effect`;
/// otherwise the reason it is not.
fn check_grouping(headers: &[String], assignment: &RoleAssignment, header: &str) -> Result<(), String> {
    if !headers.iter().any(|h| h == header) {
        return Err("is not a dataset column".to_string());
    }
    match assignment.role_of(header).unwrap_or(Role::Ignore) {
        role if role.is_grouping() => Ok(()),
        role => Err(format!("has role '{role}'; only id or fixed_effect columns can be used")),
    }
}
