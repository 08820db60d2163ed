//! Shared data models for findings, check results, and report structs.

pub mod report;

use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[serde(rename_all = "lowercase")]
/// Severity of a single finding. Ordering is info < warning < error.
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "UPPERCASE")]
/// Derived status of one check. Never set independently of findings.
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skip,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Warn => "WARN",
            CheckStatus::Skip => "SKIP",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Clone, Debug)]
/// One discrepancy instance. `line` is 0 when not line-addressable.
pub struct Finding {
    pub file: String,
    pub line: usize,
    pub description: String,
    pub severity: Severity,
    pub check_name: String,
}

impl Finding {
    pub fn new(
        file: impl Into<String>,
        line: usize,
        description: impl Into<String>,
        severity: Severity,
        check_name: &str,
    ) -> Self {
        Finding {
            file: file.into(),
            line,
            description: description.into(),
            severity,
            check_name: check_name.to_string(),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
/// Result of one check: derived status plus ordered findings.
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub findings: Vec<Finding>,
    pub summary: String,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CheckResult {
    pub fn new(name: &str, status: CheckStatus, findings: Vec<Finding>) -> Self {
        let summary = format!("{} issue(s)", findings.len());
        CheckResult {
            name: name.to_string(),
            status,
            findings,
            summary,
            elapsed: Duration::ZERO,
        }
    }

    /// A SKIP result carries no findings, only an explanatory summary.
    pub fn skipped(name: &str, summary: &str) -> Self {
        CheckResult {
            name: name.to_string(),
            status: CheckStatus::Skip,
            findings: Vec::new(),
            summary: summary.to_string(),
            elapsed: Duration::ZERO,
        }
    }
}
