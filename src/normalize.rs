//! Identifier normalization between toggle names and canonical rule keys,
//! plus version-string normalization.
//!
//! In the id-range dialect the two key functions are inverses of each other;
//! in the section dialect the toggle name already serves as the canonical
//! key, so both are identities. An empty string always means "no mapping"
//! and must never be used to join two entities.

use crate::patterns::Dialect;
use regex::Regex;

/// Convert a toggle variable name to its canonical rule key.
///
/// Id-range: `az2023stig_000100` -> `AZLX-23-000100`.
/// Section: identity.
///
/// Returns an empty string when the toggle does not match the expected
/// shape or no rule-ID prefix is known.
pub fn toggle_to_rule_key(toggle: &str, prefix: &str, rule_id_prefix: &str, dialect: Dialect) -> String {
    if dialect == Dialect::Section {
        return toggle.to_string();
    }
    let esc = regex::escape(prefix);
    let pat = Regex::new(&format!(r"^{esc}_(\d{{6}})$")).expect("toggle shape");
    match pat.captures(toggle) {
        Some(caps) if !rule_id_prefix.is_empty() => format!("{rule_id_prefix}-{}", &caps[1]),
        _ => String::new(),
    }
}

/// Convert a canonical rule key back to its toggle variable name.
///
/// Id-range: `AZLX-23-000100` -> `az2023stig_000100`.
/// Section: identity.
pub fn rule_key_to_toggle(key: &str, prefix: &str, dialect: Dialect) -> String {
    if dialect == Dialect::Section {
        return key.to_string();
    }
    let pat = Regex::new(r"(\d{6})$").expect("key suffix");
    match pat.captures(key) {
        Some(caps) => format!("{prefix}_{}", &caps[1]),
        None => String::new(),
    }
}

/// Strip an inline comment and surrounding quotes from a raw YAML value.
pub fn strip_yaml_value(raw: &str) -> String {
    let mut val = raw;
    if let Some(idx) = val.find("  #") {
        val = val[..idx].trim_end();
    }
    let bytes = val.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'\'' || first == b'"') && bytes[bytes.len() - 1] == first {
            val = &val[1..val.len() - 1];
        }
    }
    val.to_string()
}

/// Normalize a version string to a comparable numeric tuple.
///
/// Accepts `v1.2.0`, `1.2`, and the `v{major}r{minor}` revision form.
/// Unparseable strings normalize to an empty vector.
pub fn normalize_version(raw: &str) -> Vec<u32> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V']);

    let rev_pat = Regex::new(r"^(\d+)[rR](\d+)$").expect("revision form");
    if let Some(caps) = rev_pat.captures(trimmed) {
        return vec![caps[1].parse().unwrap_or(0), caps[2].parse().unwrap_or(0)];
    }

    let mut parts = Vec::new();
    for p in trimmed.split('.') {
        match p.parse::<u32>() {
            Ok(n) => parts.push(n),
            Err(_) => return Vec::new(),
        }
    }
    parts
}

/// The `(major, minor)` slice used for version comparisons. Patch digits
/// are deliberately ignored.
pub fn major_minor(norm: &[u32]) -> &[u32] {
    if norm.len() >= 2 {
        &norm[..2]
    } else {
        norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_range_round_trip() {
        let key = toggle_to_rule_key("az2023stig_000100", "az2023stig", "AZLX-23", Dialect::IdRange);
        assert_eq!(key, "AZLX-23-000100");
        let toggle = rule_key_to_toggle(&key, "az2023stig", Dialect::IdRange);
        assert_eq!(toggle, "az2023stig_000100");
    }

    #[test]
    fn test_inverse_law_holds_for_matching_toggles() {
        for digits in ["000100", "230505", "999999"] {
            let toggle = format!("az2023stig_{digits}");
            let key = toggle_to_rule_key(&toggle, "az2023stig", "AZLX-23", Dialect::IdRange);
            assert_eq!(rule_key_to_toggle(&key, "az2023stig", Dialect::IdRange), toggle);
        }
    }

    #[test]
    fn test_section_dialect_is_identity() {
        let toggle = "rhel9cis_rule_1_1_1_1";
        assert_eq!(
            toggle_to_rule_key(toggle, "rhel9cis", "", Dialect::Section),
            toggle
        );
        assert_eq!(rule_key_to_toggle(toggle, "rhel9cis", Dialect::Section), toggle);
    }

    #[test]
    fn test_unmappable_inputs_yield_empty() {
        // Wrong digit width
        assert_eq!(
            toggle_to_rule_key("az2023stig_0001", "az2023stig", "AZLX-23", Dialect::IdRange),
            ""
        );
        // Unknown rule-ID prefix
        assert_eq!(
            toggle_to_rule_key("az2023stig_000100", "az2023stig", "", Dialect::IdRange),
            ""
        );
        // Key without a numeric suffix
        assert_eq!(rule_key_to_toggle("AZLX-23-bogus", "az2023stig", Dialect::IdRange), "");
    }

    #[test]
    fn test_strip_yaml_value() {
        assert_eq!(strip_yaml_value("'0644'"), "0644");
        assert_eq!(strip_yaml_value("\"/etc/ssh\""), "/etc/ssh");
        assert_eq!(strip_yaml_value("plain  # trailing note"), "plain");
        assert_eq!(strip_yaml_value("x"), "x");
    }

    #[test]
    fn test_normalize_version_forms() {
        assert_eq!(normalize_version("v1.2.0"), vec![1, 2, 0]);
        assert_eq!(normalize_version("1.2"), vec![1, 2]);
        assert_eq!(normalize_version("v1r2"), vec![1, 2]);
        assert_eq!(normalize_version("garbage"), Vec::<u32>::new());
    }

    #[test]
    fn test_major_minor_ignores_patch() {
        let a = normalize_version("1.2.0");
        let b = normalize_version("v1.2.5");
        assert_eq!(major_minor(&a), major_minor(&b));
    }
}
