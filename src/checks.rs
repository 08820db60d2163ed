//! The consistency check battery.
//!
//! Each check is an independent function over read-only extractor output
//! and returns a `CheckResult` whose status is derived from its findings:
//! FAIL on any error, WARN on any warning (or on any finding at all for
//! warn-on-any checks), PASS otherwise. SKIP is reserved for checks whose
//! inputs are structurally inapplicable, never for parse problems.

use crate::extract::{AuditFileInfo, TaskInfo, TemplateVar};
use crate::models::{CheckResult, CheckStatus, Finding, Severity};
use crate::normalize::{major_minor, normalize_version, rule_key_to_toggle, toggle_to_rule_key};
use crate::patterns::{Dialect, Patterns};
use crate::utils;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Stable check keys (for `--skip`/`--only`) and display names, in
/// canonical battery order.
pub const CHECK_KEYS: [(&str, &str); 14] = [
    ("toggle_sync", "Rule Toggle Sync"),
    ("audit_coverage", "Audit File Coverage"),
    ("rule_id_match", "Rule ID Consistency"),
    ("rule_key_match", "Rule Key Consistency"),
    ("category_alignment", "Category Alignment"),
    ("version_consistency", "Version Consistency"),
    ("include_coverage", "Include Coverage"),
    ("config_parity", "Config Variable Parity"),
    ("template_var_sync", "Template Variable Sync"),
    ("audit_vars_completeness", "Audit Vars Completeness"),
    ("toggle_value_sync", "Toggle Value Sync"),
    ("severity_directory", "Severity-Directory Alignment"),
    ("block_pairing", "Audit Block Pairing"),
    ("when_toggle_alignment", "When-Toggle Alignment"),
];

pub fn display_name(key: &str) -> &'static str {
    CHECK_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown Check")
}

/// Derive a check status from its findings.
pub fn determine_status(findings: &[Finding], warn_on_any: bool) -> CheckStatus {
    if findings.iter().any(|f| f.severity == Severity::Error) {
        return CheckStatus::Fail;
    }
    if warn_on_any && !findings.is_empty() {
        return CheckStatus::Warn;
    }
    if findings.iter().any(|f| f.severity == Severity::Warning) {
        return CheckStatus::Warn;
    }
    CheckStatus::Pass
}

/// Check 1: rule toggles are synchronized across declarations, template,
/// audit vars, and audit conditionals.
pub fn toggle_sync(
    declared: &BTreeMap<String, usize>,
    template: &BTreeMap<String, usize>,
    audit_vars: &BTreeMap<String, usize>,
    conditionals: &BTreeMap<String, String>,
    audit_vars_name: &str,
) -> CheckResult {
    const KEY: &str = "toggle_sync";
    let mut findings = Vec::new();
    let mut all_keys: BTreeSet<&String> = BTreeSet::new();
    all_keys.extend(declared.keys());
    all_keys.extend(template.keys());
    all_keys.extend(audit_vars.keys());
    all_keys.extend(conditionals.keys());

    for key in all_keys {
        let in_declared = declared.contains_key(key);
        if in_declared && !template.contains_key(key) {
            findings.push(Finding::new(
                "templates/ansible_vars_goss.yml.j2",
                0,
                format!("In defaults but missing from template: '{key}'"),
                Severity::Warning,
                KEY,
            ));
        }
        if in_declared && !audit_vars.contains_key(key) {
            findings.push(Finding::new(
                audit_vars_name,
                0,
                format!("In defaults but missing from {audit_vars_name}: '{key}'"),
                Severity::Warning,
                KEY,
            ));
        }
        if in_declared && !conditionals.contains_key(key) {
            findings.push(Finding::new(
                "(audit files)",
                0,
                format!("In defaults but no audit conditional found: '{key}'"),
                Severity::Warning,
                KEY,
            ));
        }
        if !in_declared {
            if let Some(line) = template.get(key) {
                findings.push(Finding::new(
                    "templates/ansible_vars_goss.yml.j2",
                    *line,
                    format!("In template but missing from defaults: '{key}'"),
                    Severity::Warning,
                    KEY,
                ));
            }
            if let Some(line) = audit_vars.get(key) {
                findings.push(Finding::new(
                    audit_vars_name,
                    *line,
                    format!("In {audit_vars_name} but missing from defaults: '{key}'"),
                    Severity::Warning,
                    KEY,
                ));
            }
            if let Some(file) = conditionals.get(key) {
                findings.push(Finding::new(
                    file.clone(),
                    0,
                    format!("In audit conditional but missing from defaults: '{key}'"),
                    Severity::Warning,
                    KEY,
                ));
            }
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 2: every declared toggle has an audit file and vice versa,
/// joined through the canonical rule key. Unmappable toggles (empty key)
/// never participate.
pub fn audit_coverage(
    declared: &BTreeMap<String, usize>,
    audit_files: &BTreeMap<String, AuditFileInfo>,
    prefix: &str,
    rule_id_prefix: &str,
    dialect: Dialect,
) -> CheckResult {
    const KEY: &str = "audit_coverage";
    let mut findings = Vec::new();

    let mut declared_keys: BTreeSet<String> = BTreeSet::new();
    for toggle in declared.keys() {
        let key = toggle_to_rule_key(toggle, prefix, rule_id_prefix, dialect);
        if !key.is_empty() {
            declared_keys.insert(key);
        }
    }
    let audit_keys: BTreeSet<String> = audit_files.keys().cloned().collect();

    for key in declared_keys.difference(&audit_keys) {
        let toggle = rule_key_to_toggle(key, prefix, dialect);
        let line = declared.get(&toggle).copied().unwrap_or(0);
        findings.push(Finding::new(
            "defaults/main.yml",
            line,
            format!("Rule has no audit file: '{key}'"),
            Severity::Warning,
            KEY,
        ));
    }
    for key in audit_keys.difference(&declared_keys) {
        findings.push(Finding::new(
            audit_files[key].file.clone(),
            0,
            format!("Audit file exists but no rule toggle in defaults: '{key}'"),
            Severity::Warning,
            KEY,
        ));
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 3: structured rule identifiers agree between task metadata and
/// audit metadata for every shared key.
pub fn rule_id_match(
    task_data: &BTreeMap<String, TaskInfo>,
    audit_files: &BTreeMap<String, AuditFileInfo>,
) -> CheckResult {
    const KEY: &str = "rule_id_match";
    let mut findings = Vec::new();

    for (key, task) in task_data {
        let Some(audit) = audit_files.get(key) else {
            continue;
        };
        match (&task.structured_id, &audit.structured_id) {
            (Some(task_id), Some(audit_id)) if task_id != audit_id => {
                findings.push(Finding::new(
                    audit.file.clone(),
                    0,
                    format!("Rule ID mismatch for {key}: task='{task_id}' vs audit='{audit_id}'"),
                    Severity::Error,
                    KEY,
                ));
            }
            (Some(_), None) => {
                findings.push(Finding::new(
                    audit.file.clone(),
                    0,
                    format!("Audit file missing rule ID metadata for {key}"),
                    Severity::Warning,
                    KEY,
                ));
            }
            (None, Some(_)) => {
                findings.push(Finding::new(
                    task.file.clone(),
                    0,
                    format!("Task missing rule ID tag for {key}"),
                    Severity::Warning,
                    KEY,
                ));
            }
            _ => {}
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 4: the filename-derived and metadata-derived rule keys agree, and
/// one-sided presences (task-only / audit-only keys) are surfaced at info
/// level. Deliberately not warn-on-any: info findings alone leave PASS.
pub fn rule_key_match(
    task_data: &BTreeMap<String, TaskInfo>,
    audit_files: &BTreeMap<String, AuditFileInfo>,
    dialect: Dialect,
) -> CheckResult {
    const KEY: &str = "rule_key_match";
    let mut findings = Vec::new();

    if dialect == Dialect::IdRange {
        for (key, info) in audit_files {
            if let Some(declared) = &info.declared_id {
                if declared != key {
                    findings.push(Finding::new(
                        info.file.clone(),
                        0,
                        format!(
                            "Audit filename/metadata rule key mismatch: file='{key}' vs metadata='{declared}'"
                        ),
                        Severity::Error,
                        KEY,
                    ));
                }
            }
        }
    }

    for (key, task) in task_data {
        if !audit_files.contains_key(key) {
            findings.push(Finding::new(
                task.file.clone(),
                0,
                format!("Rule found in tasks but no audit file: '{key}'"),
                Severity::Info,
                KEY,
            ));
        }
    }
    for (key, info) in audit_files {
        if !task_data.contains_key(key) {
            findings.push(Finding::new(
                info.file.clone(),
                0,
                format!("Rule found in audit but no task: '{key}'"),
                Severity::Info,
                KEY,
            ));
        }
    }

    let status = determine_status(&findings, false);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 5: shared keys live in the same numbered category directory in
/// both repositories.
pub fn category_alignment(
    task_data: &BTreeMap<String, TaskInfo>,
    audit_files: &BTreeMap<String, AuditFileInfo>,
) -> CheckResult {
    const KEY: &str = "category_alignment";
    let mut findings = Vec::new();

    for (key, task) in task_data {
        let Some(audit) = audit_files.get(key) else {
            continue;
        };
        if let Some(audit_cat) = audit.dir_cat {
            if task.cat != audit_cat {
                findings.push(Finding::new(
                    audit.file.clone(),
                    0,
                    format!(
                        "Category mismatch for {key}: task=cat_{} vs audit=cat_{audit_cat}",
                        task.cat
                    ),
                    Severity::Error,
                    KEY,
                ));
            }
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 6: the normalized `(major, minor)` version agrees across all
/// declaration sites; the first site is the comparison base. SKIPs when
/// fewer than two sites declared a version.
pub fn version_consistency(versions: &[(String, String)]) -> CheckResult {
    const KEY: &str = "version_consistency";
    if versions.len() < 2 {
        return CheckResult::skipped(
            display_name(KEY),
            &format!("Only {} version(s) found", versions.len()),
        );
    }

    let mut findings = Vec::new();
    let (base_site, base_raw) = &versions[0];
    let base_norm = normalize_version(base_raw);
    let base_mm = major_minor(&base_norm).to_vec();

    for (site, raw) in &versions[1..] {
        let norm = normalize_version(raw);
        if major_minor(&norm) != base_mm.as_slice() {
            findings.push(Finding::new(
                site.clone(),
                0,
                format!("Version mismatch: {base_site}='{base_raw}' vs {site}='{raw}'"),
                Severity::Error,
                KEY,
            ));
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 7: every audit file path is reachable through at least one
/// manifest include glob.
pub fn include_coverage(
    globs: &[String],
    audit_files: &BTreeMap<String, AuditFileInfo>,
) -> CheckResult {
    const KEY: &str = "include_coverage";
    let compiled: Vec<glob::Pattern> = globs
        .iter()
        .filter_map(|g| glob::Pattern::new(g).ok())
        .collect();

    let mut findings = Vec::new();
    for info in audit_files.values() {
        if !compiled.iter().any(|p| p.matches(&info.file)) {
            findings.push(Finding::new(
                info.file.clone(),
                0,
                format!("Audit file not matched by any manifest glob: '{}'", info.file),
                Severity::Error,
                KEY,
            ));
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

fn is_block_value(val: &str) -> bool {
    matches!(val, "|" | ">" | "|-" | ">-")
}

/// Check 8: non-toggle config values agree between the declarations file
/// and the audit vars file. Multi-line and list values are skipped.
pub fn config_parity(
    defaults_config: &BTreeMap<String, (String, usize)>,
    audit_config: &BTreeMap<String, (String, usize)>,
    audit_vars_name: &str,
) -> CheckResult {
    const KEY: &str = "config_parity";
    let mut findings = Vec::new();

    for (var, (def_val, _)) in defaults_config {
        let Some((aud_val, aud_line)) = audit_config.get(var) else {
            continue;
        };
        if is_block_value(def_val) || is_block_value(aud_val) {
            continue;
        }
        if def_val.starts_with('[') || aud_val.starts_with('[') {
            continue;
        }
        if def_val != aud_val {
            findings.push(Finding::new(
                audit_vars_name,
                *aud_line,
                format!(
                    "Config value mismatch for '{var}': defaults='{def_val}' vs {audit_vars_name}='{aud_val}'"
                ),
                Severity::Warning,
                KEY,
            ));
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 9: literal (non-templated) template values match the declarations
/// file; literals with no declaration counterpart are info-level.
pub fn template_var_sync(
    template_vars: &BTreeMap<String, TemplateVar>,
    defaults_config: &BTreeMap<String, (String, usize)>,
    declared_toggles: &BTreeMap<String, usize>,
) -> CheckResult {
    const KEY: &str = "template_var_sync";
    let mut findings = Vec::new();

    for (var, tv) in template_vars {
        if !tv.is_literal || is_block_value(&tv.value) {
            continue;
        }
        if let Some((def_val, _)) = defaults_config.get(var) {
            if is_block_value(def_val) {
                continue;
            }
            if &tv.value != def_val {
                findings.push(Finding::new(
                    "templates/ansible_vars_goss.yml.j2",
                    tv.line,
                    format!(
                        "Literal template value mismatch for '{var}': template='{}' vs defaults='{def_val}'",
                        tv.value
                    ),
                    Severity::Warning,
                    KEY,
                ));
            }
        } else if !declared_toggles.contains_key(var) {
            findings.push(Finding::new(
                "templates/ansible_vars_goss.yml.j2",
                tv.line,
                format!("Literal template variable '{var}' not found in defaults/main.yml"),
                Severity::Info,
                KEY,
            ));
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Variables injected at audit runtime; never expected in the vars file.
const RUNTIME_VARS: [&str; 12] = [
    "machine_uuid",
    "epoch",
    "os_locale",
    "os_release",
    "os_distribution",
    "auto_group",
    "os_hostname",
    "system_type",
    "benchmark_type",
    "benchmark_version",
    "benchmark_os",
    "system_is_container",
];

/// Check 10: every prefixed variable referenced by audit assertions is
/// defined in the audit vars file, excluding toggles (covered by check 1)
/// and runtime-injected names.
pub fn audit_vars_completeness(
    var_refs: &BTreeMap<String, BTreeSet<String>>,
    defined: &BTreeSet<String>,
    prefix: &str,
    patterns: &Patterns,
) -> CheckResult {
    const KEY: &str = "audit_vars_completeness";
    let mut findings = Vec::new();
    let var_prefix = format!("{prefix}_");

    for (var, files) in var_refs {
        if patterns.is_toggle_name(var, prefix) {
            continue;
        }
        if RUNTIME_VARS.contains(&var.as_str()) {
            continue;
        }
        if !var.starts_with(&var_prefix) {
            continue;
        }
        if !defined.contains(var) {
            let shown: Vec<&str> = files.iter().map(String::as_str).take(3).collect();
            let extra = files.len().saturating_sub(3);
            let mut file_list = shown.join(", ");
            if extra > 0 {
                file_list.push_str(&format!(" (+{extra} more)"));
            }
            findings.push(Finding::new(
                "(audit test files)",
                0,
                format!(
                    "Audit test references '.Vars.{var}' but not defined in audit vars. Used in: {file_list}"
                ),
                Severity::Warning,
                KEY,
            ));
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 11: toggle values agree (case-insensitively) between the
/// declarations file and the audit vars file.
pub fn toggle_value_sync(
    defaults_values: &BTreeMap<String, (String, usize)>,
    audit_values: &BTreeMap<String, (String, usize)>,
    audit_vars_name: &str,
) -> CheckResult {
    const KEY: &str = "toggle_value_sync";
    let mut findings = Vec::new();

    for (var, (def_val, _)) in defaults_values {
        let Some((aud_val, aud_line)) = audit_values.get(var) else {
            continue;
        };
        if !def_val.trim().eq_ignore_ascii_case(aud_val.trim()) {
            findings.push(Finding::new(
                audit_vars_name,
                *aud_line,
                format!(
                    "Toggle value mismatch for '{var}': defaults='{def_val}' vs {audit_vars_name}='{aud_val}'"
                ),
                Severity::Warning,
                KEY,
            ));
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 12: the severity word in a task name maps to the expected
/// category directory (id-range dialect only; SKIP otherwise).
pub fn severity_directory(dialect: Dialect, tasks_dir: &Path) -> CheckResult {
    const KEY: &str = "severity_directory";
    if dialect != Dialect::IdRange {
        return CheckResult::skipped(
            display_name(KEY),
            "Section benchmarks do not use severity labels",
        );
    }

    let severity_pat =
        Regex::new(r#"(?i)^\s*-?\s*name:\s*"?(HIGH|MEDIUM|LOW)\s*\|"#).expect("severity pattern");
    let expected_cat = |label: &str| match label {
        "HIGH" => Some(1),
        "MEDIUM" => Some(2),
        "LOW" => Some(3),
        _ => None,
    };

    let mut findings = Vec::new();
    let parent = tasks_dir.parent().unwrap_or(tasks_dir);
    for cat in ["cat_1", "cat_2", "cat_3"] {
        let cat_path = tasks_dir.join(cat);
        if !cat_path.is_dir() {
            continue;
        }
        let cat_num: u32 = cat.trim_start_matches("cat_").parse().unwrap_or(0);
        let mut files: Vec<_> = std::fs::read_dir(&cat_path)
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
            let Ok(content) = std::fs::read_to_string(&fpath) else {
                continue;
            };
            for (idx, line) in content.lines().enumerate() {
                let Some(caps) = severity_pat.captures(line) else {
                    continue;
                };
                let label = caps[1].to_uppercase();
                if let Some(expected) = expected_cat(&label) {
                    if expected != cat_num {
                        findings.push(Finding::new(
                            rel.clone(),
                            idx + 1,
                            format!(
                                "Severity label '{label}' (expected cat_{expected}) but task is in cat_{cat_num}"
                            ),
                            Severity::Error,
                            KEY,
                        ));
                    }
                }
            }
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 13: opening structural markers (`{{ if }}`, `{{ range }}`) and
/// closing markers (`{{ end }}`) balance per audit file.
pub fn block_pairing(audit_dir: &Path) -> CheckResult {
    const KEY: &str = "block_pairing";
    let open_pat = Regex::new(r"\{\{-?\s*(if|range)\s+").expect("open pattern");
    let close_pat = Regex::new(r"\{\{-?\s*end\s*-?\}\}").expect("close pattern");

    let mut findings = Vec::new();
    for subdir in crate::extract::find_audit_subdirs(audit_dir) {
        for fpath in utils::walk_sorted(&subdir) {
            let fname = fpath
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if fname == "goss.yml" || fname == "main.yml" {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&fpath) else {
                continue;
            };
            let opens = open_pat.find_iter(&content).count();
            let closes = close_pat.find_iter(&content).count();
            if opens != closes {
                findings.push(Finding::new(
                    utils::relpath(&fpath, audit_dir),
                    0,
                    format!("Block mismatch: {opens} opening (if/range) vs {closes} closing (end)"),
                    Severity::Warning,
                    KEY,
                ));
            }
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}

/// Check 14: a task's `when:` condition references the toggle derived
/// algebraically from the rule key in its name (id-range dialect only).
pub fn when_toggle_alignment(
    tasks_dir: &Path,
    prefix: &str,
    rule_id_prefix: &str,
    dialect: Dialect,
) -> CheckResult {
    const KEY: &str = "when_toggle_alignment";
    if dialect != Dialect::IdRange || rule_id_prefix.is_empty() {
        return CheckResult::skipped(display_name(KEY), "Only applicable to id-range benchmarks");
    }

    let key_pat = Regex::new(&format!(r"(?i)({}-\d{{6}})", regex::escape(rule_id_prefix)))
        .expect("key pattern");
    let when_pat = Regex::new(&format!(r"when:\s*.*({}_\d{{6}})", regex::escape(prefix)))
        .expect("when pattern");
    let digits_pat = Regex::new(r"(\d{6})$").expect("digits pattern");

    let mut findings = Vec::new();
    let parent = tasks_dir.parent().unwrap_or(tasks_dir);
    for cat in ["cat_1", "cat_2", "cat_3"] {
        let cat_path = tasks_dir.join(cat);
        if !cat_path.is_dir() {
            continue;
        }
        let mut files: Vec<_> = std::fs::read_dir(&cat_path)
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
            let Ok(content) = std::fs::read_to_string(&fpath) else {
                continue;
            };

            let mut current_key: Option<String> = None;
            for (idx, line) in content.lines().enumerate() {
                let stripped = line.trim();
                if stripped.starts_with("- name:") || stripped.starts_with("name:") {
                    if let Some(caps) = key_pat.captures(stripped) {
                        current_key = Some(caps[1].to_uppercase());
                    }
                }
                if let Some(key) = current_key.clone() {
                    if stripped.contains("when:") {
                        if let Some(caps) = when_pat.captures(stripped) {
                            let when_toggle = caps[1].to_string();
                            if let Some(digits) = digits_pat.captures(&key) {
                                let expected = format!("{prefix}_{}", &digits[1]);
                                if when_toggle != expected {
                                    findings.push(Finding::new(
                                        rel.clone(),
                                        idx + 1,
                                        format!(
                                            "When-toggle mismatch for {key}: expected '{expected}' but found '{when_toggle}'"
                                        ),
                                        Severity::Error,
                                        KEY,
                                    ));
                                }
                            }
                            current_key = None;
                        }
                    }
                }
            }
        }
    }

    let status = determine_status(&findings, true);
    CheckResult::new(display_name(KEY), status, findings)
}
