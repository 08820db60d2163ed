//! Extraction of identifier→attribute maps from the two repositories.
//!
//! Every extractor is a pure function over file paths: a missing file or
//! directory yields an empty map (absence is reported by the checks, not
//! here), malformed lines are skipped, and outputs are ordered maps so
//! repeated runs produce identical results. Tree walks collect a sorted
//! file list, fan the per-file scans out with rayon, and fold the partial
//! results back in file order so first-occurrence-wins stays deterministic.

use crate::patterns::{Dialect, Patterns};
use crate::utils;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata extracted from a single audit assertion file.
#[derive(Clone, Debug, Default)]
pub struct AuditFileInfo {
    /// Path relative to the audit repository root.
    pub file: String,
    /// Category number parsed from the containing directory name.
    pub dir_cat: Option<u32>,
    /// Category number from a `Cat:` metadata comment.
    pub meta_cat: Option<u32>,
    /// Structured rule identifier from a `Rule_ID:` metadata comment.
    pub structured_id: Option<String>,
    /// Rule key declared in a `STIG_ID:` metadata comment.
    pub declared_id: Option<String>,
    /// Toggle referenced by the file's `{{ if .Vars.* }}` conditional.
    pub toggle: Option<String>,
}

/// Metadata extracted from one declared remediation task.
#[derive(Clone, Debug)]
pub struct TaskInfo {
    pub structured_id: Option<String>,
    pub cat: u32,
    pub file: String,
}

/// One variable assignment found in the remediation template.
#[derive(Clone, Debug)]
pub struct TemplateVar {
    pub value: String,
    /// True when the value carries no templating marker.
    pub is_literal: bool,
    pub line: usize,
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Audit content subdirectories (`cat_*`, `section_*`), sorted.
pub fn find_audit_subdirs(audit_dir: &Path) -> Vec<PathBuf> {
    let mut subdirs = Vec::new();
    let Ok(entries) = fs::read_dir(audit_dir) else {
        return subdirs;
    };
    for entry in entries.flatten() {
        let p = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if p.is_dir() && (name.starts_with("cat_") || name.starts_with("section_")) {
            subdirs.push(p);
        }
    }
    subdirs.sort();
    subdirs
}

/// All assertion files under the audit content subdirectories, sorted,
/// excluding the manifest and entry files.
fn audit_assertion_files(audit_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for subdir in find_audit_subdirs(audit_dir) {
        for p in utils::walk_sorted(&subdir) {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if name == "goss.yml" || name == "main.yml" {
                continue;
            }
            files.push(p);
        }
    }
    files.sort();
    files
}

/// Toggle declarations from a flat variables file: name -> line number.
pub fn extract_toggles(path: &Path, patterns: &Patterns) -> BTreeMap<String, usize> {
    let mut toggles = BTreeMap::new();
    for (idx, line) in read_lines(path).iter().enumerate() {
        if let Some(caps) = patterns.toggle.captures(line.trim()) {
            toggles.insert(caps[1].to_string(), idx + 1);
        }
    }
    toggles
}

/// Toggle declarations with their declared value: name -> (value, line).
pub fn extract_toggle_values(path: &Path, patterns: &Patterns) -> BTreeMap<String, (String, usize)> {
    let mut toggles = BTreeMap::new();
    for (idx, line) in read_lines(path).iter().enumerate() {
        let stripped = line.trim();
        let Some(caps) = patterns.toggle.captures(stripped) else {
            continue;
        };
        let name = caps[1].to_string();
        let val_pat = Regex::new(&format!(r"^{}\s*:\s*(\S+)", regex::escape(&name)))
            .expect("value pattern");
        let val = val_pat
            .captures(stripped)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        toggles.insert(name, (val, idx + 1));
    }
    toggles
}

/// Toggle references inside audit conditionals: toggle -> relative file.
/// The first occurrence in walk order wins.
pub fn extract_audit_conditionals(audit_dir: &Path, patterns: &Patterns) -> BTreeMap<String, String> {
    let files = audit_assertion_files(audit_dir);
    let per_file: Vec<Vec<(String, String)>> = files
        .par_iter()
        .map(|fpath| {
            let rel = utils::relpath(fpath, audit_dir);
            read_lines(fpath)
                .iter()
                .filter_map(|line| patterns.conditional.captures(line))
                .map(|caps| (caps[1].to_string(), rel.clone()))
                .collect()
        })
        .collect();

    let mut conditionals = BTreeMap::new();
    for pairs in per_file {
        for (toggle, rel) in pairs {
            conditionals.entry(toggle).or_insert(rel);
        }
    }
    conditionals
}

/// Audit assertion files keyed by their canonical rule key.
///
/// Id-range keys are the filename stem when it matches the structured key
/// shape, else the declared metadata key, else the stem. Section keys are
/// the conditional's toggle, else the stem. The asymmetry follows the
/// repositories' conventions; disagreements between the two derivations
/// are surfaced by the rule-key consistency check.
pub fn extract_audit_files(audit_dir: &Path, patterns: &Patterns) -> BTreeMap<String, AuditFileInfo> {
    let structured_pat = Regex::new(r"Rule_ID:\s*(SV-\d+r\d+_rule)").expect("rule id pattern");
    let declared_pat = Regex::new(r"STIG_ID:\s*(\S+)").expect("declared id pattern");
    let cat_meta_pat = Regex::new(r"Cat:\s*(\d+)").expect("cat pattern");
    let cat_dir_pat = Regex::new(r"cat_(\d)").expect("cat dir pattern");
    let stem_key_pat = Regex::new(r"^[A-Z]+-\d+-\d{6}$").expect("stem pattern");

    let files = audit_assertion_files(audit_dir);
    let per_file: Vec<(String, AuditFileInfo)> = files
        .par_iter()
        .filter_map(|fpath| {
            let rel = utils::relpath(fpath, audit_dir);
            let stem = fpath
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();

            let dir_cat = cat_dir_pat
                .captures(&rel)
                .and_then(|c| c[1].parse::<u32>().ok());

            let mut info = AuditFileInfo {
                file: rel,
                dir_cat,
                ..Default::default()
            };
            for line in read_lines(fpath) {
                if info.structured_id.is_none() {
                    if let Some(c) = structured_pat.captures(&line) {
                        info.structured_id = Some(c[1].to_string());
                    }
                }
                if info.declared_id.is_none() {
                    if let Some(c) = declared_pat.captures(&line) {
                        info.declared_id = Some(c[1].to_string());
                    }
                }
                if info.meta_cat.is_none() {
                    if let Some(c) = cat_meta_pat.captures(&line) {
                        info.meta_cat = c[1].parse::<u32>().ok();
                    }
                }
                if info.toggle.is_none() {
                    if let Some(c) = patterns.conditional.captures(&line) {
                        info.toggle = Some(c[1].to_string());
                    }
                }
            }

            let key = match patterns.dialect {
                Dialect::IdRange => {
                    if stem_key_pat.is_match(&stem) {
                        stem.clone()
                    } else {
                        info.declared_id.clone().unwrap_or_else(|| stem.clone())
                    }
                }
                Dialect::Section => info.toggle.clone().unwrap_or_else(|| stem.clone()),
            };
            if key.is_empty() {
                None
            } else {
                Some((key, info))
            }
        })
        .collect();

    per_file.into_iter().collect()
}

/// Task metadata keyed by canonical rule key.
///
/// Id-range tasks are keyed by the structured key found in task names;
/// section tasks by the toggle in `when:` conditions or task names. The
/// first structured rule identifier seen while a key is current is
/// attached to that key.
pub fn extract_task_data(
    tasks_dir: &Path,
    dialect: Dialect,
    prefix: &str,
    rule_id_prefix: &str,
) -> BTreeMap<String, TaskInfo> {
    let structured_pat = Regex::new(r"(SV-\d+r\d+_rule)").expect("rule id pattern");
    let name_pat = (dialect == Dialect::IdRange && !rule_id_prefix.is_empty()).then(|| {
        Regex::new(&format!(
            r"(?i)({}-\d{{6}})",
            regex::escape(rule_id_prefix)
        ))
        .expect("name pattern")
    });
    let when_pat = (dialect == Dialect::Section).then(|| {
        Regex::new(&format!(r"({}_rule_[\d_]+)", regex::escape(prefix))).expect("when pattern")
    });

    let mut task_map: BTreeMap<String, TaskInfo> = BTreeMap::new();
    let parent = tasks_dir.parent().unwrap_or(tasks_dir);
    for cat in ["cat_1", "cat_2", "cat_3"] {
        let cat_path = tasks_dir.join(cat);
        if !cat_path.is_dir() {
            continue;
        }
        let cat_num: u32 = cat.trim_start_matches("cat_").parse().unwrap_or(0);

        let mut files: Vec<PathBuf> = fs::read_dir(&cat_path)
            .map(|rd| rd.flatten().map(|e| e.path()).collect())
            .unwrap_or_default();
        files.sort();
        for fpath in files {
            let fname = fpath
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if !fname.ends_with(".yml") || fname == "main.yml" {
                continue;
            }
            let rel = utils::relpath(&fpath, parent);

            let mut current_key: Option<String> = None;
            for line in read_lines(&fpath) {
                let stripped = line.trim();

                if let Some(pat) = &name_pat {
                    if stripped.starts_with("- name:") || stripped.starts_with("name:") {
                        if let Some(caps) = pat.captures(stripped) {
                            let key = caps[1].to_uppercase();
                            task_map.entry(key.clone()).or_insert(TaskInfo {
                                structured_id: None,
                                cat: cat_num,
                                file: rel.clone(),
                            });
                            current_key = Some(key);
                        }
                    }
                } else if let Some(pat) = &when_pat {
                    let is_keyed_line = stripped.contains("when:")
                        || stripped.starts_with("- name:")
                        || stripped.starts_with("name:");
                    let hit = if is_keyed_line {
                        pat.captures(stripped).map(|c| c[1].to_string())
                    } else if pat
                        .find(stripped)
                        .is_some_and(|m| m.start() == 0 && m.end() == stripped.len())
                    {
                        // Bare toggle lines inside when: lists
                        Some(stripped.to_string())
                    } else {
                        None
                    };
                    if let Some(key) = hit {
                        task_map.entry(key.clone()).or_insert(TaskInfo {
                            structured_id: None,
                            cat: cat_num,
                            file: rel.clone(),
                        });
                        current_key = Some(key);
                    }
                }

                if let Some(key) = &current_key {
                    if let Some(info) = task_map.get_mut(key) {
                        if info.structured_id.is_none() {
                            if let Some(caps) = structured_pat.captures(stripped) {
                                info.structured_id = Some(caps[1].to_string());
                            }
                        }
                    }
                }
            }
        }
    }
    task_map
}

/// Raw benchmark version strings per declaration site, in site order.
///
/// Site order matters: the first discovered site becomes the comparison
/// base for the version consistency check.
pub fn extract_versions(
    declarations_path: &Path,
    audit_vars_path: &Path,
    audit_dir: &Path,
    run_script_path: &Path,
) -> Vec<(String, String)> {
    let yaml_pat =
        Regex::new(r##"^benchmark_version:\s*['"]?([^'"#]+)"##).expect("version pattern");
    let script_pat = Regex::new(r"^BENCHMARK_VER\s*=\s*([^\s#]+)").expect("script pattern");

    let mut versions = Vec::new();
    for line in read_lines(declarations_path) {
        if let Some(caps) = yaml_pat.captures(&line) {
            versions.push(("defaults/main.yml".to_string(), caps[1].trim().to_string()));
            break;
        }
    }
    let audit_vars_site = utils::relpath(audit_vars_path, audit_dir);
    for line in read_lines(audit_vars_path) {
        if let Some(caps) = yaml_pat.captures(&line) {
            versions.push((audit_vars_site.clone(), caps[1].trim().to_string()));
            break;
        }
    }
    for line in read_lines(run_script_path) {
        if let Some(caps) = script_pat.captures(&line) {
            versions.push(("run_audit.sh".to_string(), caps[1].trim().to_string()));
            break;
        }
    }
    versions
}

/// Include globs from the audit manifest: `<glob>.yml: {}` lines, in file
/// order, skipping templated lines.
pub fn extract_include_globs(manifest_path: &Path) -> Vec<String> {
    let glob_pat = Regex::new(r"^([\w.*?/\[\]-]+\.yml)\s*:\s*\{\}").expect("glob pattern");
    let mut patterns = Vec::new();
    for line in read_lines(manifest_path) {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') || stripped.contains("{{") {
            continue;
        }
        if let Some(caps) = glob_pat.captures(stripped) {
            patterns.push(caps[1].to_string());
        }
    }
    patterns
}

/// Non-toggle prefixed config variables: name -> (value, line). Values are
/// stripped of inline comments and quotes; toggles are excluded so the two
/// variable populations never overlap.
pub fn extract_config_variables(
    path: &Path,
    prefix: &str,
    patterns: &Patterns,
) -> BTreeMap<String, (String, usize)> {
    let config_pat =
        Regex::new(&format!(r"^({}_\w+)\s*:\s*(.+)$", regex::escape(prefix))).expect("config pattern");
    let mut variables = BTreeMap::new();
    for (idx, line) in read_lines(path).iter().enumerate() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        if patterns.toggle.is_match(stripped) {
            continue;
        }
        if let Some(caps) = config_pat.captures(stripped) {
            let value = crate::normalize::strip_yaml_value(caps[2].trim());
            variables.insert(caps[1].to_string(), (value, idx + 1));
        }
    }
    variables
}

/// Prefixed variables assigned in the remediation template, flagged as
/// literal when the value carries no templating marker.
pub fn extract_template_variables(
    template_path: &Path,
    prefix: &str,
    patterns: &Patterns,
) -> BTreeMap<String, TemplateVar> {
    let var_pat =
        Regex::new(&format!(r"^({}_\w+)\s*:\s*(.+)$", regex::escape(prefix))).expect("var pattern");
    let mut variables = BTreeMap::new();
    for (idx, line) in read_lines(template_path).iter().enumerate() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        if patterns.toggle.is_match(stripped) {
            continue;
        }
        if let Some(caps) = var_pat.captures(stripped) {
            let raw = caps[2].trim();
            let is_literal = !raw.contains("{{");
            let value = if is_literal {
                crate::normalize::strip_yaml_value(raw)
            } else {
                raw.to_string()
            };
            variables.insert(
                caps[1].to_string(),
                TemplateVar {
                    value,
                    is_literal,
                    line: idx + 1,
                },
            );
        }
    }
    variables
}

/// All `.Vars.<name>` references in audit assertion files:
/// name -> set of referencing files.
pub fn extract_var_references(audit_dir: &Path) -> BTreeMap<String, BTreeSet<String>> {
    let var_pat = Regex::new(r"\.Vars\.(\w+)").expect("vars pattern");
    let files = audit_assertion_files(audit_dir);
    let per_file: Vec<Vec<(String, String)>> = files
        .par_iter()
        .map(|fpath| {
            let rel = utils::relpath(fpath, audit_dir);
            read_lines(fpath)
                .iter()
                .flat_map(|line| var_pat.captures_iter(line).collect::<Vec<_>>())
                .map(|caps| (caps[1].to_string(), rel.clone()))
                .collect()
        })
        .collect();

    let mut references: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for pairs in per_file {
        for (name, rel) in pairs {
            references.entry(name).or_default().insert(rel);
        }
    }
    references
}

/// Top-level variable names defined in the audit variables file.
pub fn extract_defined_vars(audit_vars_path: &Path) -> BTreeSet<String> {
    let def_pat = Regex::new(r"^(\w+)\s*:").expect("def pattern");
    let mut defined = BTreeSet::new();
    for line in read_lines(audit_vars_path) {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        if let Some(caps) = def_pat.captures(stripped) {
            defined.insert(caps[1].to_string());
        }
    }
    defined
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn id_range_patterns() -> Patterns {
        Patterns::build("az2023stig", Dialect::IdRange)
    }

    #[test]
    fn test_extract_toggles_and_values() {
        let dir = tempdir().unwrap();
        let decl = dir.path().join("main.yml");
        fs::write(
            &decl,
            "---\naz2023stig_000100: true\naz2023stig_000110: false\naz2023stig_sshd_config: x\n",
        )
        .unwrap();
        let pats = id_range_patterns();
        let toggles = extract_toggles(&decl, &pats);
        assert_eq!(toggles.len(), 2);
        assert_eq!(toggles["az2023stig_000100"], 2);

        let values = extract_toggle_values(&decl, &pats);
        assert_eq!(values["az2023stig_000110"].0, "false");
    }

    #[test]
    fn test_missing_file_yields_empty_map() {
        let dir = tempdir().unwrap();
        let pats = id_range_patterns();
        assert!(extract_toggles(&dir.path().join("absent.yml"), &pats).is_empty());
        assert!(extract_include_globs(&dir.path().join("absent.yml")).is_empty());
        assert!(extract_defined_vars(&dir.path().join("absent.yml")).is_empty());
    }

    #[test]
    fn test_conditionals_first_occurrence_wins() {
        let dir = tempdir().unwrap();
        let cat = dir.path().join("cat_1");
        fs::create_dir_all(&cat).unwrap();
        fs::write(
            cat.join("a.yml"),
            "{{ if .Vars.az2023stig_000100 }}\n{{ end }}\n",
        )
        .unwrap();
        fs::write(
            cat.join("b.yml"),
            "{{ if .Vars.az2023stig_000100 }}\n{{ end }}\n",
        )
        .unwrap();
        let map = extract_audit_conditionals(dir.path(), &id_range_patterns());
        assert_eq!(map["az2023stig_000100"], "cat_1/a.yml");
    }

    #[test]
    fn test_audit_files_id_range_keyed_by_stem() {
        let dir = tempdir().unwrap();
        let cat = dir.path().join("cat_2");
        fs::create_dir_all(&cat).unwrap();
        fs::write(
            cat.join("AZLX-23-000100.yml"),
            "# Rule_ID: SV-123456r789012_rule\n# STIG_ID: AZLX-23-000100\n# Cat: 2\n{{ if .Vars.az2023stig_000100 }}\n{{ end }}\n",
        )
        .unwrap();
        let map = extract_audit_files(dir.path(), &id_range_patterns());
        let info = &map["AZLX-23-000100"];
        assert_eq!(info.dir_cat, Some(2));
        assert_eq!(info.meta_cat, Some(2));
        assert_eq!(info.structured_id.as_deref(), Some("SV-123456r789012_rule"));
        assert_eq!(info.declared_id.as_deref(), Some("AZLX-23-000100"));
        assert_eq!(info.toggle.as_deref(), Some("az2023stig_000100"));
    }

    #[test]
    fn test_audit_files_section_keyed_by_conditional_toggle() {
        let dir = tempdir().unwrap();
        let section = dir.path().join("section_1");
        fs::create_dir_all(&section).unwrap();
        fs::write(
            section.join("firewall.yml"),
            "{{ if .Vars.rhel9cis_rule_1_1_1_1 }}\n{{ end }}\n",
        )
        .unwrap();
        let pats = Patterns::build("rhel9cis", Dialect::Section);
        let map = extract_audit_files(dir.path(), &pats);
        assert!(map.contains_key("rhel9cis_rule_1_1_1_1"));
    }

    #[test]
    fn test_task_data_id_range_attaches_structured_id() {
        let dir = tempdir().unwrap();
        let tasks = dir.path().join("tasks");
        let cat = tasks.join("cat_1");
        fs::create_dir_all(&cat).unwrap();
        fs::write(
            cat.join("ssh.yml"),
            concat!(
                "- name: \"HIGH | AZLX-23-000100 | Disable root login\"\n",
                "  tags:\n",
                "    - SV-123456r789012_rule\n",
                "  when: az2023stig_000100\n",
            ),
        )
        .unwrap();
        let map = extract_task_data(&tasks, Dialect::IdRange, "az2023stig", "AZLX-23");
        let info = &map["AZLX-23-000100"];
        assert_eq!(info.cat, 1);
        assert_eq!(info.structured_id.as_deref(), Some("SV-123456r789012_rule"));
        assert_eq!(info.file, "tasks/cat_1/ssh.yml");
    }

    #[test]
    fn test_task_data_section_keys_from_when_and_bare_lines() {
        let dir = tempdir().unwrap();
        let tasks = dir.path().join("tasks");
        let cat = tasks.join("cat_2");
        fs::create_dir_all(&cat).unwrap();
        fs::write(
            cat.join("mounts.yml"),
            concat!(
                "- name: \"1.1.1.1 | Ensure mounting is disabled\"\n",
                "  when: rhel9cis_rule_1_1_1_1\n",
                "- name: \"1.1.1.2 | Ensure squashfs is disabled\"\n",
                "  when: >\n",
                "    rhel9cis_rule_1_1_1_2\n",
            ),
        )
        .unwrap();
        let map = extract_task_data(&tasks, Dialect::Section, "rhel9cis", "");
        assert!(map.contains_key("rhel9cis_rule_1_1_1_1"));
        assert_eq!(map["rhel9cis_rule_1_1_1_1"].cat, 2);
        // Folded when: values are picked up from the continuation line.
        assert!(map.contains_key("rhel9cis_rule_1_1_1_2"));
    }

    #[test]
    fn test_versions_in_site_order() {
        let dir = tempdir().unwrap();
        let decl = dir.path().join("defaults_main.yml");
        fs::write(&decl, "benchmark_version: '1.2.0'\n").unwrap();
        let audit = dir.path().join("audit");
        let vars = audit.join("vars");
        fs::create_dir_all(&vars).unwrap();
        let vars_file = vars.join("STIG.yml");
        fs::write(&vars_file, "benchmark_version: v1.2.5\n").unwrap();
        let script = audit.join("run_audit.sh");
        fs::write(&script, "#!/bin/bash\nBENCHMARK_VER=v1r2\n").unwrap();

        let versions = extract_versions(&decl, &vars_file, &audit, &script);
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[0], ("defaults/main.yml".into(), "1.2.0".into()));
        assert_eq!(versions[1], ("vars/STIG.yml".into(), "v1.2.5".into()));
        assert_eq!(versions[2], ("run_audit.sh".into(), "v1r2".into()));
    }

    #[test]
    fn test_include_globs_skip_templated_lines() {
        let dir = tempdir().unwrap();
        let manifest = dir.path().join("goss.yml");
        fs::write(
            &manifest,
            "gossfile:\n  cat_1/*.yml: {}\n  cat_2/*.yml: {}\n  {{ if .Vars.x }}extra.yml: {}{{ end }}\n",
        )
        .unwrap();
        let globs = extract_include_globs(&manifest);
        assert_eq!(globs, vec!["cat_1/*.yml", "cat_2/*.yml"]);
    }

    #[test]
    fn test_config_variables_exclude_toggles_and_strip_values() {
        let dir = tempdir().unwrap();
        let decl = dir.path().join("main.yml");
        fs::write(
            &decl,
            "az2023stig_000100: true\naz2023stig_sshd_config: '/etc/ssh/sshd_config'  # path\n",
        )
        .unwrap();
        let vars = extract_config_variables(&decl, "az2023stig", &id_range_patterns());
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["az2023stig_sshd_config"].0, "/etc/ssh/sshd_config");
    }

    #[test]
    fn test_template_variables_literal_flag() {
        let dir = tempdir().unwrap();
        let tmpl = dir.path().join("vars.yml.j2");
        fs::write(
            &tmpl,
            "az2023stig_sshd_config: /etc/ssh/sshd_config\naz2023stig_timeout: {{ az2023stig_timeout }}\n",
        )
        .unwrap();
        let vars = extract_template_variables(&tmpl, "az2023stig", &id_range_patterns());
        assert!(vars["az2023stig_sshd_config"].is_literal);
        assert!(!vars["az2023stig_timeout"].is_literal);
    }

    #[test]
    fn test_var_references_collect_all_sites() {
        let dir = tempdir().unwrap();
        let cat = dir.path().join("cat_1");
        fs::create_dir_all(&cat).unwrap();
        fs::write(
            cat.join("a.yml"),
            "exec: grep {{ .Vars.az2023stig_sshd_config }} {{ .Vars.epoch }}\n",
        )
        .unwrap();
        let refs = extract_var_references(dir.path());
        assert!(refs["az2023stig_sshd_config"].contains("cat_1/a.yml"));
        assert!(refs.contains_key("epoch"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let dir = tempdir().unwrap();
        let cat = dir.path().join("cat_1");
        fs::create_dir_all(&cat).unwrap();
        for i in 0..5 {
            fs::write(
                cat.join(format!("AZLX-23-00010{i}.yml")),
                format!("{{{{ if .Vars.az2023stig_00010{i} }}}}\n{{{{ end }}}}\n"),
            )
            .unwrap();
        }
        let pats = id_range_patterns();
        let a = extract_audit_conditionals(dir.path(), &pats);
        let b = extract_audit_conditionals(dir.path(), &pats);
        assert_eq!(a, b);
    }
}
