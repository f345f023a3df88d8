// Dataset header -> Stata variable name

use std::collections::{HashMap, HashSet};

/// Longest variable name Stata accepts.
pub const MAX_NAME_LEN: usize = 32;

/// Names Stata reserves; a header that sanitizes to one of these gets a
/// trailing underscore.
const RESERVED: &[&str] = &[
    "_all", "_b", "byte", "_coef", "_cons", "double", "float", "if", "in", "int", "long", "_n", "_N",
    "_pi", "_pred", "_rc", "_se", "_skip", "str", "strL", "using", "with",
];

/// Sanitize one header: characters other than ASCII letters, digits and `_`
/// become `_`; a leading digit gets a `_` prefix; the result is cut to 32
/// characters.
pub fn sanitize(header: &str) -> String {
    let mut name: String = header
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() {
        name.push_str("_var");
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.truncate(MAX_NAME_LEN);

    if RESERVED.contains(&name.as_str()) {
        name.truncate(MAX_NAME_LEN - 1);
        name.push('_');
    }
    name
}

/// Unique Stata names for a header sequence.
///
/// Built over the whole header list in order, so a header's name depends
/// only on the headers before it. Collisions get `_2`, `_3`, … with the base
/// shortened to stay within 32 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StataNames {
    names: HashMap<String, String>,
}

impl StataNames {
    pub fn new(headers: &[String]) -> Self {
        let mut taken: HashSet<String> = HashSet::with_capacity(headers.len());
        let mut names = HashMap::with_capacity(headers.len());

        for header in headers {
            let base = sanitize(header);
            let mut candidate = base.clone();
            let mut k = 2;
            while taken.contains(&candidate) {
                let suffix = format!("_{k}");
                let mut stem = base.clone();
                stem.truncate(MAX_NAME_LEN - suffix.len());
                candidate = format!("{stem}{suffix}");
                k += 1;
            }
            taken.insert(candidate.clone());
            names.insert(header.clone(), candidate);
        }

        Self { names }
    }

    /// Stata name of `header`. Headers outside the list are sanitized on
    /// the fly.
    pub fn get(&self, header: &str) -> String {
        self.names.get(header).cloned().unwrap_or_else(|| sanitize(header))
    }

    /// New variable name derived from `header`'s name plus `suffix`, clear of
    /// every header's name and of `also_taken`.
    pub fn derive(&self, header: &str, suffix: &str, also_taken: &[String]) -> String {
        let base = self.get(header);
        let taken = |c: &String| self.names.values().any(|n| n == c) || also_taken.contains(c);

        let mut stem = base.clone();
        stem.truncate(MAX_NAME_LEN - suffix.len());
        let mut candidate = format!("{stem}{suffix}");
        let mut k = 2;
        while taken(&candidate) {
            let tail = format!("{suffix}_{k}");
            let mut stem = base.clone();
            stem.truncate(MAX_NAME_LEN - tail.len());
            candidate = format!("{stem}{tail}");
            k += 1;
        }
        candidate
    }
}

/// Spreadsheet column letter for a 0-based column index (`0` -> `A`,
/// `26` -> `AA`). Stata names imported columns this way when no header row
/// is read.
pub fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
