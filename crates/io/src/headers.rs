// Header row normalization

use std::collections::HashSet;

/// Normalize a raw header row: trim each name, name blank columns
/// `column_<n>` (1-based), and suffix duplicates `_1`, `_2`, … until unique.
/// Case is preserved, so `GDP` and `gdp` are distinct headers.
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut out = Vec::with_capacity(raw.len());

    for (idx, name) in raw.into_iter().enumerate() {
        let trimmed = name.trim();
        let base = if trimmed.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            trimmed.to_string()
        };

        let mut candidate = base.clone();
        let mut k = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}_{k}");
            k += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }

    out
}
