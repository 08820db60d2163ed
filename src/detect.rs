//! Auto-detection of the benchmark prefix, naming dialect, and rule-ID
//! prefix. Detection runs once per reconciliation pass; the results are
//! passed explicitly into every extractor and check.

use crate::patterns::Dialect;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Detect the common variable prefix from a declarations file.
///
/// Each top-level (unindented, non-comment) declaration votes for every
/// prefix of 1..=3 underscore-delimited segments of its name. Shorter
/// prefixes accumulate more votes because every longer name also votes for
/// its ancestors, surfacing the common root. Ties keep first-seen order.
///
/// Returns an empty string when the file is missing or holds no top-level
/// declarations; callers treat that as a fatal precondition failure.
pub fn detect_prefix(declarations_path: &Path) -> String {
    let name_pat = Regex::new(r"^([a-zA-Z_]\w*):").expect("name pattern");
    // Insertion-ordered vote table so the tie-break is deterministic.
    let mut votes: Vec<(String, usize)> = Vec::new();

    let Ok(content) = fs::read_to_string(declarations_path) else {
        return String::new();
    };
    for line in content.lines() {
        let s = line.trim_end();
        if s.is_empty() || s.starts_with('#') || s.starts_with(' ') || s.starts_with('\t') {
            continue;
        }
        let Some(caps) = name_pat.captures(s) else {
            continue;
        };
        let parts: Vec<&str> = caps[1].split('_').collect();
        // A name votes for its proper prefixes of up to 3 segments.
        for i in 1..parts.len().min(4) {
            let candidate = parts[..i].join("_");
            match votes.iter_mut().find(|(name, _)| *name == candidate) {
                Some((_, count)) => *count += 1,
                None => votes.push((candidate, 1)),
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, count) in &votes {
        if best.map_or(true, |(_, c)| *count > c) {
            best = Some((name, *count));
        }
    }
    best.map(|(name, _)| name.to_string()).unwrap_or_default()
}

/// Infer the naming dialect by counting declaration shapes.
///
/// Section dialect declares `{prefix}_rule_<digits>` toggles; id-range
/// dialect declares `{prefix}_<6digits>` toggles. The shape with more
/// matches wins; ties favor id-range.
pub fn detect_dialect(declarations_path: &Path, prefix: &str) -> Dialect {
    let esc = regex::escape(prefix);
    let section_pat = Regex::new(&format!(r"^{esc}_rule_\d")).expect("section pattern");
    let range_pat = Regex::new(&format!(r"^{esc}_\d{{6}}\s*:")).expect("range pattern");

    let mut section_count = 0usize;
    let mut range_count = 0usize;
    if let Ok(content) = fs::read_to_string(declarations_path) {
        for line in content.lines() {
            let stripped = line.trim();
            if section_pat.is_match(stripped) {
                section_count += 1;
            } else if range_pat.is_match(stripped) {
                range_count += 1;
            }
        }
    }
    if section_count > range_count {
        Dialect::Section
    } else {
        Dialect::IdRange
    }
}

/// Detect the rule-ID prefix (e.g. `AZLX-23`) from audit filenames.
///
/// Walks `cat_1..cat_3` under the audit root looking for the first file
/// shaped `{PREFIX}-{6digits}.yml`. Section-dialect benchmarks have no
/// rule-ID prefix; callers pass an empty string through.
pub fn detect_rule_id_prefix(audit_dir: &Path) -> String {
    let fname_pat = Regex::new(r"^([A-Z]+-\d+)-\d{6}\.yml$").expect("filename pattern");
    for cat in ["cat_1", "cat_2", "cat_3"] {
        let cat_path = audit_dir.join(cat);
        if !cat_path.is_dir() {
            continue;
        }
        for fname in crate::utils::walk_sorted(&cat_path) {
            let name = fname
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if let Some(caps) = fname_pat.captures(&name) {
                return caps[1].to_string();
            }
        }
    }
    String::new()
}
