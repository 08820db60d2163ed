//! Configuration discovery and effective settings resolution.
//!
//! Crossaudit reads `crossaudit.toml|yaml|yml` from the remediation repo
//! root and merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `output`: `human`
//! - `format`: `md`
//! - `strict`: false
//! - `skip`/`only`: empty
//!
//! Overrides precedence: CLI > config file > defaults.
//!
//! This module also hosts the repository-level discovery helpers: locating
//! the sibling audit repo and the audit variables file.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `crossaudit.toml|yaml`.
pub struct FileConfig {
    pub output: Option<String>,
    pub format: Option<String>,
    pub strict: Option<bool>,
    #[serde(default)]
    pub skip: Option<Vec<String>>,
    #[serde(default)]
    pub only: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by the check command.
pub struct Effective {
    pub output: String,
    pub format: String,
    pub strict: bool,
    pub skip: BTreeSet<String>,
    pub only: BTreeSet<String>,
}

/// Load `FileConfig` from `crossaudit.toml` or `crossaudit.yaml|yml`.
pub fn load_config(root: &Path) -> Option<FileConfig> {
    let toml_path = root.join("crossaudit.toml");
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).ok()?;
        let cfg: FileConfig = toml::from_str(&s).ok()?;
        return Some(cfg);
    }
    for yml in ["crossaudit.yaml", "crossaudit.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).ok()?;
            let cfg: FileConfig = serde_yaml::from_str(&s).ok()?;
            return Some(cfg);
        }
    }
    None
}

fn split_csv(raw: Option<&str>) -> Option<Vec<String>> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Resolve `Effective` by merging CLI flags, discovered config, and
/// defaults.
pub fn resolve_effective(
    remediation_root: &Path,
    cli_output: Option<&str>,
    cli_format: Option<&str>,
    cli_strict: bool,
    cli_skip: Option<&str>,
    cli_only: Option<&str>,
) -> Effective {
    let cfg = load_config(remediation_root).unwrap_or_default();

    let output = cli_output
        .map(str::to_string)
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    let format = cli_format
        .map(str::to_string)
        .or(cfg.format)
        .unwrap_or_else(|| "md".to_string());
    let strict = cli_strict || cfg.strict.unwrap_or(false);

    let skip: BTreeSet<String> = split_csv(cli_skip)
        .or(cfg.skip)
        .unwrap_or_default()
        .into_iter()
        .collect();
    let only: BTreeSet<String> = split_csv(cli_only)
        .or(cfg.only)
        .unwrap_or_default()
        .into_iter()
        .collect();

    Effective {
        output,
        format,
        strict,
        skip,
        only,
    }
}

/// Whether a check should run under the skip/only filters.
pub fn should_run(check_key: &str, skip: &BTreeSet<String>, only: &BTreeSet<String>) -> bool {
    if !only.is_empty() {
        return only.contains(check_key);
    }
    !skip.contains(check_key)
}

/// Locate the sibling audit repo from the remediation repo path.
///
/// Search order:
/// 1. `{basename}-Audit`
/// 2. Strip a `Private-`/`Private_` prefix, then `{benchmark}-Audit`
/// 3. Any `*-Audit` sibling sharing the benchmark root word
pub fn discover_audit_repo(remediation_dir: &Path) -> Option<PathBuf> {
    let parent = remediation_dir.parent()?;
    let base = remediation_dir.file_name()?.to_string_lossy().to_string();

    let candidate = parent.join(format!("{base}-Audit"));
    if candidate.is_dir() {
        return Some(candidate);
    }

    let benchmark = base
        .strip_prefix("Private-")
        .or_else(|| base.strip_prefix("private-"))
        .or_else(|| base.strip_prefix("Private_"))
        .or_else(|| base.strip_prefix("private_"))
        .unwrap_or(&base)
        .to_string();
    if benchmark != base {
        let candidate = parent.join(format!("{benchmark}-Audit"));
        if candidate.is_dir() {
            return Some(candidate);
        }
    }

    let root_word = benchmark.split('-').next().unwrap_or(&benchmark).to_string();
    let mut entries: Vec<PathBuf> = fs::read_dir(parent)
        .map(|rd| rd.flatten().map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();
    for entry in entries {
        let name = entry
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if entry.is_dir() && name.ends_with("-Audit") && name.contains(&root_word) {
            return Some(entry);
        }
    }
    None
}

/// Find the audit variables file under `<audit>/vars/`.
///
/// Tries the well-known names first, then the first `.yml`/`.yaml` file,
/// then a default path (which may not exist; extraction degrades to empty).
pub fn discover_audit_vars_file(audit_dir: &Path) -> PathBuf {
    let vars_dir = audit_dir.join("vars");
    let fallback = vars_dir.join("STIG.yml");
    if !vars_dir.is_dir() {
        return fallback;
    }

    for name in ["STIG.yml", "CIS.yml", "stig.yml", "cis.yml"] {
        let candidate = vars_dir.join(name);
        if candidate.is_file() {
            return candidate;
        }
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(&vars_dir)
        .map(|rd| rd.flatten().map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();
    for entry in entries {
        if entry
            .extension()
            .is_some_and(|e| e == "yml" || e == "yaml")
        {
            return entry;
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_toml_and_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("crossaudit.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output = "json"
strict = true
skip = ["block_pairing"]
    "#
        )
        .unwrap();

        let eff = resolve_effective(root, None, None, false, None, None);
        assert_eq!(eff.output, "json");
        assert!(eff.strict);
        assert!(eff.skip.contains("block_pairing"));

        // CLI wins over the file.
        let eff = resolve_effective(root, Some("human"), None, false, Some("toggle_sync"), None);
        assert_eq!(eff.output, "human");
        assert_eq!(eff.skip.len(), 1);
        assert!(eff.skip.contains("toggle_sync"));
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("crossaudit.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
format: json
only:
  - version_consistency
            "#
        )
        .unwrap();

        let eff = resolve_effective(root, None, None, false, None, None);
        assert_eq!(eff.format, "json");
        assert_eq!(eff.output, "human");
        assert!(!eff.strict);
        assert!(eff.only.contains("version_consistency"));
    }

    #[test]
    fn test_should_run_filters() {
        let mut skip = BTreeSet::new();
        skip.insert("a".to_string());
        let mut only = BTreeSet::new();
        assert!(!should_run("a", &skip, &only));
        assert!(should_run("b", &skip, &only));
        only.insert("c".to_string());
        assert!(should_run("c", &skip, &only));
        assert!(!should_run("b", &skip, &only));
    }

    #[test]
    fn test_discover_audit_repo_exact_and_private() {
        let dir = tempdir().unwrap();
        let parent = dir.path();
        fs::create_dir_all(parent.join("RHEL9-CIS")).unwrap();
        fs::create_dir_all(parent.join("RHEL9-CIS-Audit")).unwrap();
        let found = discover_audit_repo(&parent.join("RHEL9-CIS")).unwrap();
        assert!(found.ends_with("RHEL9-CIS-Audit"));

        fs::create_dir_all(parent.join("Private-AMAZON2023-STIG")).unwrap();
        fs::create_dir_all(parent.join("AMAZON2023-STIG-Audit")).unwrap();
        let found = discover_audit_repo(&parent.join("Private-AMAZON2023-STIG")).unwrap();
        assert!(found.ends_with("AMAZON2023-STIG-Audit"));
    }

    #[test]
    fn test_discover_audit_repo_fuzzy() {
        let dir = tempdir().unwrap();
        let parent = dir.path();
        fs::create_dir_all(parent.join("UBUNTU22-CIS")).unwrap();
        fs::create_dir_all(parent.join("UBUNTU22-CIS-Goss-Audit")).unwrap();
        let found = discover_audit_repo(&parent.join("UBUNTU22-CIS")).unwrap();
        assert!(found.ends_with("UBUNTU22-CIS-Goss-Audit"));
    }

    #[test]
    fn test_discover_audit_vars_known_name_then_fallback() {
        let dir = tempdir().unwrap();
        let vars = dir.path().join("vars");
        fs::create_dir_all(&vars).unwrap();
        fs::write(vars.join("custom.yml"), "").unwrap();
        let found = discover_audit_vars_file(dir.path());
        assert!(found.ends_with("vars/custom.yml"));

        fs::write(vars.join("CIS.yml"), "").unwrap();
        let found = discover_audit_vars_file(dir.path());
        assert!(found.ends_with("vars/CIS.yml"));
    }
}
