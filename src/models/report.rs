//! Report schema: run metadata, aggregate counts, and the report object
//! handed to the renderers.

use crate::models::{CheckResult, CheckStatus};
use serde::Serialize;

#[derive(Serialize, Clone, Default, Debug)]
/// Metadata describing one reconciliation run.
pub struct ReportMetadata {
    pub remediation_repo: String,
    pub audit_repo: String,
    pub date: String,
    pub benchmark_prefix: String,
    pub dialect: String,
    pub rule_id_prefix: String,
    pub benchmark_version: String,
    pub remediation_branch: String,
    pub audit_branch: String,
}

#[derive(Serialize, Clone, Copy, Default, Debug)]
/// Counts of check results by status.
pub struct StatusCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn tally(results: &[CheckResult]) -> Self {
        let mut c = StatusCounts {
            total: results.len(),
            ..Default::default()
        };
        for r in results {
            match r.status {
                CheckStatus::Pass => c.passed += 1,
                CheckStatus::Fail => c.failed += 1,
                CheckStatus::Warn => c.warnings += 1,
                CheckStatus::Skip => c.skipped += 1,
            }
        }
        c
    }
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
/// Overall run classification, mapped to an exit code by the binary.
pub enum OverallStatus {
    Passing,
    Warning,
    Failing,
}

#[derive(Serialize, Clone, Debug)]
/// The complete output of one reconciliation run.
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: StatusCounts,
    pub checks: Vec<CheckResult>,
}

impl Report {
    pub fn new(metadata: ReportMetadata, checks: Vec<CheckResult>) -> Self {
        let summary = StatusCounts::tally(&checks);
        Report {
            metadata,
            summary,
            checks,
        }
    }

    /// Failing if any check failed, warning if any warned, passing otherwise.
    pub fn overall(&self) -> OverallStatus {
        if self.checks.iter().any(|r| r.status == CheckStatus::Fail) {
            OverallStatus::Failing
        } else if self.checks.iter().any(|r| r.status == CheckStatus::Warn) {
            OverallStatus::Warning
        } else {
            OverallStatus::Passing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckStatus, Finding, Severity};

    fn result(name: &str, status: CheckStatus) -> CheckResult {
        CheckResult::new(name, status, Vec::new())
    }

    #[test]
    fn test_tally_counts_each_status() {
        let results = vec![
            result("a", CheckStatus::Pass),
            result("b", CheckStatus::Fail),
            result("c", CheckStatus::Warn),
            result("d", CheckStatus::Skip),
            result("e", CheckStatus::Pass),
        ];
        let c = StatusCounts::tally(&results);
        assert_eq!(c.total, 5);
        assert_eq!(c.passed, 2);
        assert_eq!(c.failed, 1);
        assert_eq!(c.warnings, 1);
        assert_eq!(c.skipped, 1);
    }

    #[test]
    fn test_overall_fail_beats_warn() {
        let report = Report::new(
            ReportMetadata::default(),
            vec![
                result("a", CheckStatus::Warn),
                result("b", CheckStatus::Fail),
            ],
        );
        assert_eq!(report.overall(), OverallStatus::Failing);
    }

    #[test]
    fn test_overall_passing_ignores_skips() {
        let report = Report::new(
            ReportMetadata::default(),
            vec![
                result("a", CheckStatus::Pass),
                result("b", CheckStatus::Skip),
            ],
        );
        assert_eq!(report.overall(), OverallStatus::Passing);
    }

    #[test]
    fn test_finding_serializes_lowercase_severity() {
        let f = Finding::new("x.yml", 3, "msg", Severity::Warning, "demo");
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["severity"], "warning");
        assert_eq!(v["line"], 3);
    }
}
