//! Naming dialect and the compiled patterns shared by every extractor.
//!
//! Two toggle naming dialects are supported:
//! - `Section`: `{prefix}_rule_{sections}` e.g. `rhel9cis_rule_1_1_1_1`
//! - `IdRange`: `{prefix}_{6digits}` e.g. `az2023stig_000100`
//!
//! Patterns are built exactly once per run so dialect inference cannot
//! disagree between extractors.

use regex::Regex;
use serde::Serialize;
use std::fmt;

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "kebab-case")]
/// Benchmark naming dialect for rule toggles and rule keys.
pub enum Dialect {
    /// Hierarchical section numbering embedded in the toggle name.
    Section,
    /// Fixed-width numeric rule IDs joined to an alphabetic prefix.
    IdRange,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Section => f.write_str("section"),
            Dialect::IdRange => f.write_str("id-range"),
        }
    }
}

/// Compiled patterns for toggle declarations and audit conditionals.
pub struct Patterns {
    pub dialect: Dialect,
    /// Matches a toggle declaration line, capturing the toggle name.
    pub toggle: Regex,
    /// Matches a `{{ if .Vars.<toggle> }}` conditional, capturing the toggle.
    pub conditional: Regex,
}

impl Patterns {
    /// Compile the per-run patterns for `prefix` under `dialect`.
    pub fn build(prefix: &str, dialect: Dialect) -> Patterns {
        let esc = regex::escape(prefix);
        let (toggle, conditional) = match dialect {
            Dialect::Section => (
                format!(r"^({esc}_rule_[\d_]+)\s*:"),
                format!(r"\{{\{{\s*if\s+\.Vars\.({esc}_rule_[\d_]+)"),
            ),
            Dialect::IdRange => (
                format!(r"^({esc}_\d{{6}})\s*:"),
                format!(r"\{{\{{\s*if\s+\.Vars\.({esc}_\d{{6}})"),
            ),
        };
        Patterns {
            dialect,
            toggle: Regex::new(&toggle).expect("toggle pattern"),
            conditional: Regex::new(&conditional).expect("conditional pattern"),
        }
    }

    /// Whether a bare variable name follows the toggle naming convention.
    pub fn is_toggle_name(&self, var: &str, prefix: &str) -> bool {
        let esc = regex::escape(prefix);
        let shape = match self.dialect {
            Dialect::Section => format!(r"^{esc}_rule_\d"),
            Dialect::IdRange => format!(r"^{esc}_\d{{6}}$"),
        };
        Regex::new(&shape).map(|re| re.is_match(var)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_toggle_pattern() {
        let pats = Patterns::build("rhel9cis", Dialect::Section);
        let caps = pats.toggle.captures("rhel9cis_rule_1_1_1_1: true").unwrap();
        assert_eq!(&caps[1], "rhel9cis_rule_1_1_1_1");
        assert!(pats.toggle.captures("rhel9cis_sshd_config: x").is_none());
    }

    #[test]
    fn test_id_range_toggle_pattern_requires_six_digits() {
        let pats = Patterns::build("az2023stig", Dialect::IdRange);
        assert!(pats.toggle.is_match("az2023stig_000100: true"));
        assert!(!pats.toggle.is_match("az2023stig_0001: true"));
        assert!(!pats.toggle.is_match("az2023stig_rule_1_1: true"));
    }

    #[test]
    fn test_conditional_pattern_matches_template_marker() {
        let pats = Patterns::build("az2023stig", Dialect::IdRange);
        let line = "{{ if .Vars.az2023stig_000100 }}";
        let caps = pats.conditional.captures(line).unwrap();
        assert_eq!(&caps[1], "az2023stig_000100");
    }

    #[test]
    fn test_is_toggle_name_per_dialect() {
        let section = Patterns::build("rhel9cis", Dialect::Section);
        assert!(section.is_toggle_name("rhel9cis_rule_1_2", "rhel9cis"));
        assert!(!section.is_toggle_name("rhel9cis_sshd_config", "rhel9cis"));

        let range = Patterns::build("az2023stig", Dialect::IdRange);
        assert!(range.is_toggle_name("az2023stig_000100", "az2023stig"));
        // Trailing content disqualifies the fixed-width form.
        assert!(!range.is_toggle_name("az2023stig_000100_extra", "az2023stig"));
    }
}
