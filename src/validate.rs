//! The reconciliation pipeline: detection, pattern building, extraction,
//! and the check battery.
//!
//! One call to `run` performs one pass. Detection happens exactly once and
//! the results are passed explicitly into every extractor and check; the
//! battery fans out with rayon and a panicking check is converted into a
//! single FAIL result without aborting the rest.

use crate::checks;
use crate::config::{self, should_run};
use crate::detect;
use crate::extract;
use crate::models::report::{Report, ReportMetadata};
use crate::models::{CheckResult, CheckStatus, Finding, Severity};
use crate::patterns::{Dialect, Patterns};
use crate::utils;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A condition under which the run cannot proceed meaningfully. Surfaced
/// before any checks run, never as a finding.
#[derive(Debug)]
pub enum PreconditionError {
    RemediationMissing(PathBuf),
    AuditMissing(PathBuf),
    PrefixUndetectable(PathBuf),
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionError::RemediationMissing(p) => {
                write!(f, "remediation directory not found: {}", p.display())
            }
            PreconditionError::AuditMissing(p) => {
                write!(f, "audit directory not found: {}", p.display())
            }
            PreconditionError::PrefixUndetectable(p) => {
                write!(
                    f,
                    "could not auto-detect benchmark prefix from {}",
                    p.display()
                )
            }
        }
    }
}

impl std::error::Error for PreconditionError {}

/// Options for one reconciliation pass.
pub struct RunOptions<'a> {
    pub remediation_dir: &'a Path,
    pub audit_dir: &'a Path,
    /// Detected from the declarations file when absent.
    pub dialect_override: Option<Dialect>,
    pub skip: &'a BTreeSet<String>,
    pub only: &'a BTreeSet<String>,
    pub verbose: bool,
}

fn log(verbose: bool, msg: &str) {
    if verbose {
        eprintln!("{} {}", utils::info_prefix(), msg);
    }
}

/// Run one reconciliation pass and assemble the report.
pub fn run(opts: &RunOptions) -> Result<Report, PreconditionError> {
    if !opts.remediation_dir.is_dir() {
        return Err(PreconditionError::RemediationMissing(
            opts.remediation_dir.to_path_buf(),
        ));
    }
    if !opts.audit_dir.is_dir() {
        return Err(PreconditionError::AuditMissing(opts.audit_dir.to_path_buf()));
    }

    let declarations_path = opts.remediation_dir.join("defaults").join("main.yml");
    let template_path = opts
        .remediation_dir
        .join("templates")
        .join("ansible_vars_goss.yml.j2");
    let tasks_dir = opts.remediation_dir.join("tasks");
    let audit_vars_path = config::discover_audit_vars_file(opts.audit_dir);
    let audit_vars_name = utils::relpath(&audit_vars_path, opts.audit_dir);
    let manifest_path = opts.audit_dir.join("goss.yml");
    let run_script_path = opts.audit_dir.join("run_audit.sh");

    let prefix = detect::detect_prefix(&declarations_path);
    if prefix.is_empty() {
        return Err(PreconditionError::PrefixUndetectable(declarations_path));
    }
    log(opts.verbose, &format!("Detected benchmark prefix: {prefix}"));

    let dialect = opts
        .dialect_override
        .unwrap_or_else(|| detect::detect_dialect(&declarations_path, &prefix));
    log(opts.verbose, &format!("Naming dialect: {dialect}"));

    let patterns = Patterns::build(&prefix, dialect);

    let rule_id_prefix = if dialect == Dialect::IdRange {
        let p = detect::detect_rule_id_prefix(opts.audit_dir);
        if p.is_empty() {
            log(opts.verbose, "No rule-ID prefix detected from audit filenames");
        } else {
            log(opts.verbose, &format!("Detected rule-ID prefix: {p}"));
        }
        p
    } else {
        String::new()
    };

    // Extraction. Each extractor is independent; the tree walkers fan out
    // internally over files.
    log(opts.verbose, "Extracting toggles and values...");
    let declared_toggles = extract::extract_toggles(&declarations_path, &patterns);
    let template_toggles = extract::extract_toggles(&template_path, &patterns);
    let audit_vars_toggles = extract::extract_toggles(&audit_vars_path, &patterns);
    let declared_values = extract::extract_toggle_values(&declarations_path, &patterns);
    let audit_values = extract::extract_toggle_values(&audit_vars_path, &patterns);

    log(opts.verbose, "Extracting audit conditionals and metadata...");
    let conditionals = extract::extract_audit_conditionals(opts.audit_dir, &patterns);
    let audit_files = extract::extract_audit_files(opts.audit_dir, &patterns);

    log(opts.verbose, "Extracting task metadata...");
    let task_data = extract::extract_task_data(&tasks_dir, dialect, &prefix, &rule_id_prefix);

    log(opts.verbose, "Extracting versions, globs, and variables...");
    let versions = extract::extract_versions(
        &declarations_path,
        &audit_vars_path,
        opts.audit_dir,
        &run_script_path,
    );
    let include_globs = extract::extract_include_globs(&manifest_path);
    let defaults_config =
        extract::extract_config_variables(&declarations_path, &prefix, &patterns);
    let audit_config = extract::extract_config_variables(&audit_vars_path, &prefix, &patterns);
    let template_vars = extract::extract_template_variables(&template_path, &prefix, &patterns);
    let var_refs = extract::extract_var_references(opts.audit_dir);
    let defined_vars = extract::extract_defined_vars(&audit_vars_path);

    // The battery, in canonical order. Each entry is deferred so the
    // filtered set can run concurrently.
    type CheckFn<'a> = Box<dyn Fn() -> CheckResult + Send + Sync + 'a>;
    let battery: Vec<(&str, CheckFn<'_>)> = vec![
        (
            "toggle_sync",
            Box::new(|| {
                checks::toggle_sync(
                    &declared_toggles,
                    &template_toggles,
                    &audit_vars_toggles,
                    &conditionals,
                    &audit_vars_name,
                )
            }),
        ),
        (
            "audit_coverage",
            Box::new(|| {
                checks::audit_coverage(
                    &declared_toggles,
                    &audit_files,
                    &prefix,
                    &rule_id_prefix,
                    dialect,
                )
            }),
        ),
        (
            "rule_id_match",
            Box::new(|| checks::rule_id_match(&task_data, &audit_files)),
        ),
        (
            "rule_key_match",
            Box::new(|| checks::rule_key_match(&task_data, &audit_files, dialect)),
        ),
        (
            "category_alignment",
            Box::new(|| checks::category_alignment(&task_data, &audit_files)),
        ),
        (
            "version_consistency",
            Box::new(|| checks::version_consistency(&versions)),
        ),
        (
            "include_coverage",
            Box::new(|| checks::include_coverage(&include_globs, &audit_files)),
        ),
        (
            "config_parity",
            Box::new(|| checks::config_parity(&defaults_config, &audit_config, &audit_vars_name)),
        ),
        (
            "template_var_sync",
            Box::new(|| {
                checks::template_var_sync(&template_vars, &defaults_config, &declared_toggles)
            }),
        ),
        (
            "audit_vars_completeness",
            Box::new(|| {
                checks::audit_vars_completeness(&var_refs, &defined_vars, &prefix, &patterns)
            }),
        ),
        (
            "toggle_value_sync",
            Box::new(|| checks::toggle_value_sync(&declared_values, &audit_values, &audit_vars_name)),
        ),
        (
            "severity_directory",
            Box::new(|| checks::severity_directory(dialect, &tasks_dir)),
        ),
        (
            "block_pairing",
            Box::new(|| checks::block_pairing(opts.audit_dir)),
        ),
        (
            "when_toggle_alignment",
            Box::new(|| {
                checks::when_toggle_alignment(&tasks_dir, &prefix, &rule_id_prefix, dialect)
            }),
        ),
    ];

    let selected: Vec<&(&str, CheckFn<'_>)> = battery
        .iter()
        .filter(|entry| should_run(entry.0, opts.skip, opts.only))
        .collect();

    // Fan out; collect preserves battery order. A panicking check becomes
    // one FAIL result and the rest still run.
    let results: Vec<CheckResult> = selected
        .into_par_iter()
        .map(|entry| {
            let key = entry.0;
            let started = Instant::now();
            let mut result = match catch_unwind(AssertUnwindSafe(|| (entry.1)())) {
                Ok(r) => r,
                Err(_) => CheckResult {
                    name: checks::display_name(key).to_string(),
                    status: CheckStatus::Fail,
                    findings: vec![Finding::new(
                        "N/A",
                        0,
                        "Check crashed internally",
                        Severity::Error,
                        key,
                    )],
                    summary: "Internal error".to_string(),
                    elapsed: started.elapsed(),
                },
            };
            result.elapsed = started.elapsed();
            result
        })
        .collect();

    // Release the deferred check closures (which borrow `prefix` and
    // `rule_id_prefix`) before those values are moved into the metadata below.
    drop(battery);

    if opts.verbose {
        for r in &results {
            log(true, &format!("{}: {} ({:.3}s)", r.name, r.status, r.elapsed.as_secs_f64()));
        }
    }

    let benchmark_version = versions
        .iter()
        .find(|(site, _)| site == "defaults/main.yml")
        .map(|(_, raw)| raw.clone())
        .unwrap_or_default();

    let metadata = ReportMetadata {
        remediation_repo: basename(opts.remediation_dir),
        audit_repo: basename(opts.audit_dir),
        date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        benchmark_prefix: prefix,
        dialect: dialect.to_string(),
        rule_id_prefix,
        benchmark_version,
        remediation_branch: utils::git_branch(opts.remediation_dir),
        audit_branch: utils::git_branch(opts.audit_dir),
    };

    Ok(Report::new(metadata, results))
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::report::OverallStatus;
    use std::fs;
    use tempfile::tempdir;

    /// Build a small id-range repo pair that is fully consistent.
    fn build_consistent_pair(parent: &Path) -> (PathBuf, PathBuf) {
        let rem = parent.join("AMAZON2023-STIG");
        let audit = parent.join("AMAZON2023-STIG-Audit");

        fs::create_dir_all(rem.join("defaults")).unwrap();
        fs::write(
            rem.join("defaults/main.yml"),
            concat!(
                "---\n",
                "benchmark_version: '1.2.0'\n",
                "az2023stig_000100: true\n",
                "az2023stig_sshd_config: /etc/ssh/sshd_config\n",
            ),
        )
        .unwrap();

        fs::create_dir_all(rem.join("templates")).unwrap();
        fs::write(
            rem.join("templates/ansible_vars_goss.yml.j2"),
            concat!(
                "az2023stig_000100: {{ az2023stig_000100 }}\n",
                "az2023stig_sshd_config: {{ az2023stig_sshd_config }}\n",
            ),
        )
        .unwrap();

        fs::create_dir_all(rem.join("tasks/cat_1")).unwrap();
        fs::write(
            rem.join("tasks/cat_1/ssh.yml"),
            concat!(
                "- name: \"HIGH | AZLX-23-000100 | Disable root login\"\n",
                "  tags:\n",
                "    - SV-123456r789012_rule\n",
                "  when: az2023stig_000100\n",
            ),
        )
        .unwrap();

        fs::create_dir_all(audit.join("vars")).unwrap();
        fs::write(
            audit.join("vars/STIG.yml"),
            concat!(
                "benchmark_version: v1.2.5\n",
                "az2023stig_000100: true\n",
                "az2023stig_sshd_config: /etc/ssh/sshd_config\n",
            ),
        )
        .unwrap();

        fs::create_dir_all(audit.join("cat_1")).unwrap();
        fs::write(
            audit.join("cat_1/AZLX-23-000100.yml"),
            concat!(
                "# Rule_ID: SV-123456r789012_rule\n",
                "# STIG_ID: AZLX-23-000100\n",
                "# Cat: 1\n",
                "{{ if .Vars.az2023stig_000100 }}\n",
                "command:\n",
                "  sshd_check:\n",
                "    exec: grep {{ .Vars.az2023stig_sshd_config }}\n",
                "{{ end }}\n",
            ),
        )
        .unwrap();

        fs::write(audit.join("goss.yml"), "gossfile:\n  cat_1/*.yml: {}\n").unwrap();
        fs::write(audit.join("run_audit.sh"), "#!/bin/bash\nBENCHMARK_VER=v1.2.0\n").unwrap();

        (rem, audit)
    }

    #[test]
    fn test_run_consistent_pair_passes() {
        let dir = tempdir().unwrap();
        let (rem, audit) = build_consistent_pair(dir.path());
        let empty = BTreeSet::new();
        let report = run(&RunOptions {
            remediation_dir: &rem,
            audit_dir: &audit,
            dialect_override: None,
            skip: &empty,
            only: &empty,
            verbose: false,
        })
        .unwrap();

        assert_eq!(report.metadata.benchmark_prefix, "az2023stig");
        assert_eq!(report.metadata.dialect, "id-range");
        assert_eq!(report.metadata.rule_id_prefix, "AZLX-23");
        assert_eq!(report.checks.len(), 14);
        for r in &report.checks {
            assert_ne!(r.status, CheckStatus::Fail, "{} failed: {:?}", r.name, r.findings);
            assert_ne!(r.status, CheckStatus::Warn, "{} warned: {:?}", r.name, r.findings);
        }
        assert_eq!(report.overall(), OverallStatus::Passing);
    }

    #[test]
    fn test_run_detects_drift() {
        let dir = tempdir().unwrap();
        let (rem, audit) = build_consistent_pair(dir.path());
        // Drift: a second toggle declared with no audit counterpart, and a
        // version bump at one site only.
        fs::write(
            rem.join("defaults/main.yml"),
            concat!(
                "---\n",
                "benchmark_version: '2.0.0'\n",
                "az2023stig_000100: true\n",
                "az2023stig_000110: true\n",
                "az2023stig_sshd_config: /etc/ssh/sshd_config\n",
            ),
        )
        .unwrap();

        let empty = BTreeSet::new();
        let report = run(&RunOptions {
            remediation_dir: &rem,
            audit_dir: &audit,
            dialect_override: None,
            skip: &empty,
            only: &empty,
            verbose: false,
        })
        .unwrap();

        let by_name = |name: &str| {
            report
                .checks
                .iter()
                .find(|r| r.name == name)
                .unwrap_or_else(|| panic!("missing check {name}"))
        };
        assert_eq!(by_name("Rule Toggle Sync").status, CheckStatus::Warn);
        assert_eq!(by_name("Audit File Coverage").status, CheckStatus::Warn);
        assert_eq!(by_name("Version Consistency").status, CheckStatus::Fail);
        assert_eq!(report.overall(), OverallStatus::Failing);
    }

    #[test]
    fn test_run_missing_declarations_is_precondition_failure() {
        let dir = tempdir().unwrap();
        let rem = dir.path().join("rem");
        let audit = dir.path().join("audit");
        fs::create_dir_all(&rem).unwrap();
        fs::create_dir_all(&audit).unwrap();

        let empty = BTreeSet::new();
        let err = run(&RunOptions {
            remediation_dir: &rem,
            audit_dir: &audit,
            dialect_override: None,
            skip: &empty,
            only: &empty,
            verbose: false,
        })
        .unwrap_err();
        assert!(matches!(err, PreconditionError::PrefixUndetectable(_)));
    }

    #[test]
    fn test_run_only_filter_limits_battery() {
        let dir = tempdir().unwrap();
        let (rem, audit) = build_consistent_pair(dir.path());
        let empty = BTreeSet::new();
        let mut only = BTreeSet::new();
        only.insert("version_consistency".to_string());
        let report = run(&RunOptions {
            remediation_dir: &rem,
            audit_dir: &audit,
            dialect_override: None,
            skip: &empty,
            only: &only,
            verbose: false,
        })
        .unwrap();
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].name, "Version Consistency");
    }

    #[test]
    fn test_run_twice_is_deterministic() {
        let dir = tempdir().unwrap();
        let (rem, audit) = build_consistent_pair(dir.path());
        let empty = BTreeSet::new();
        let opts = RunOptions {
            remediation_dir: &rem,
            audit_dir: &audit,
            dialect_override: None,
            skip: &empty,
            only: &empty,
            verbose: false,
        };
        let a = run(&opts).unwrap();
        let b = run(&opts).unwrap();
        let statuses = |r: &Report| {
            r.checks
                .iter()
                .map(|c| (c.name.clone(), c.status, c.findings.len()))
                .collect::<Vec<_>>()
        };
        assert_eq!(statuses(&a), statuses(&b));
    }
}
