//! Report rendering for the check command.
//!
//! Supports a colored `human` console view plus `md`, `json`, and `html`
//! file formats. The JSON composition is kept pure for testing.

use crate::models::report::Report;
use crate::models::{CheckStatus, Finding, Severity};
use owo_colors::OwoColorize;
use serde_json::{json, Value as JsonVal};

/// Findings shown per check before truncating.
const MAX_FINDINGS: usize = 200;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn status_badge(status: CheckStatus, color: bool) -> String {
    let raw = format!("[{}]", status.as_str());
    if !color {
        return raw;
    }
    match status {
        CheckStatus::Pass => raw.green().bold().to_string(),
        CheckStatus::Fail => raw.red().bold().to_string(),
        CheckStatus::Warn => raw.yellow().bold().to_string(),
        CheckStatus::Skip => raw.bright_black().bold().to_string(),
    }
}

fn severity_icon(severity: Severity, color: bool) -> String {
    let (icon, raw) = match severity {
        Severity::Error => ("✖", "⟦error⟧"),
        Severity::Warning => ("▲", "⟦warn⟧"),
        Severity::Info => ("◆", "⟦info⟧"),
    };
    if !color {
        return format!("{icon} {raw}");
    }
    match severity {
        Severity::Error => format!("{} {}", icon.red(), raw.red().bold()),
        Severity::Warning => format!("{} {}", icon.yellow(), raw.yellow().bold()),
        Severity::Info => format!("{} {}", icon.blue(), raw.blue().bold()),
    }
}

/// Print the report to the console in the requested output mode.
pub fn print_report(report: &Report, output: &str) {
    if output == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&compose_report_json(report)).unwrap()
        );
        return;
    }
    let color = use_colors(output);

    for r in &report.checks {
        println!("{} {} — {}", status_badge(r.status, color), r.name, r.summary);
        for f in r.findings.iter().take(MAX_FINDINGS) {
            let file = if color {
                f.file.clone().bold().to_string()
            } else {
                f.file.clone()
            };
            let loc = if f.line > 0 {
                format!("{file}:{}", f.line)
            } else {
                file
            };
            println!("  {} {} — {}", severity_icon(f.severity, color), loc, f.description);
        }
        if r.findings.len() > MAX_FINDINGS {
            println!("  ... {} more findings omitted", r.findings.len() - MAX_FINDINGS);
        }
    }

    let s = &report.summary;
    let line = format!(
        "— Summary — checks={} passed={} failed={} warnings={} skipped={}",
        s.total, s.passed, s.failed, s.warnings, s.skipped
    );
    if color {
        println!("{}", line.bold());
    } else {
        println!("{line}");
    }
}

/// Dispatch to the requested file-format generator.
pub fn generate_report(report: &Report, fmt: &str) -> String {
    match fmt {
        "json" => generate_json(report),
        "html" => generate_html(report),
        _ => generate_markdown(report),
    }
}

/// Compose the JSON report object (pure) for output and tests.
pub fn compose_report_json(report: &Report) -> JsonVal {
    let mut meta = serde_json::to_value(&report.metadata).unwrap();
    meta["generated_by"] = json!(format!("crossaudit v{}", env!("CARGO_PKG_VERSION")));
    json!({
        "metadata": meta,
        "overall": report.overall(),
        "summary": report.summary,
        "checks": report.checks.iter().map(|r| json!({
            "name": r.name,
            "status": r.status,
            "summary": r.summary,
            "findings": r.findings,
        })).collect::<Vec<_>>(),
    })
}

pub fn generate_json(report: &Report) -> String {
    serde_json::to_string_pretty(&compose_report_json(report)).unwrap()
}

fn finding_line_cell(f: &Finding) -> String {
    if f.line > 0 {
        f.line.to_string()
    } else {
        "-".to_string()
    }
}

/// Generate the Markdown report.
pub fn generate_markdown(report: &Report) -> String {
    let meta = &report.metadata;
    let mut lines: Vec<String> = Vec::new();
    lines.push("# Cross-Repo Reconciliation Report\n".to_string());
    lines.push(format!("**Remediation:** {}  ", meta.remediation_repo));
    lines.push(format!("**Audit:** {}  ", meta.audit_repo));
    lines.push(format!("**Date:** {}  ", meta.date));
    lines.push(format!("**Benchmark Prefix:** {}  ", meta.benchmark_prefix));
    lines.push(format!("**Dialect:** {}  ", meta.dialect));
    if !meta.rule_id_prefix.is_empty() {
        lines.push(format!("**Rule ID Prefix:** {}  ", meta.rule_id_prefix));
    }
    if !meta.benchmark_version.is_empty() {
        lines.push(format!("**Benchmark Version:** {}  ", meta.benchmark_version));
    }
    if !meta.remediation_branch.is_empty() {
        lines.push(format!("**Remediation Branch:** {}  ", meta.remediation_branch));
    }
    if !meta.audit_branch.is_empty() {
        lines.push(format!("**Audit Branch:** {}  ", meta.audit_branch));
    }
    lines.push(String::new());

    let s = &report.summary;
    lines.push("## Summary\n".to_string());
    lines.push("| Metric | Count |".to_string());
    lines.push("|--------|-------|".to_string());
    lines.push(format!("| Total Checks | {} |", s.total));
    lines.push(format!("| Passed | {} |", s.passed));
    lines.push(format!("| Failed | {} |", s.failed));
    lines.push(format!("| Warnings | {} |", s.warnings));
    lines.push(format!("| Skipped | {} |", s.skipped));
    lines.push(String::new());

    lines.push("| Check | Status | Findings |".to_string());
    lines.push("|-------|--------|----------|".to_string());
    for r in &report.checks {
        lines.push(format!("| {} | {} | {} |", r.name, r.status, r.summary));
    }
    lines.push(String::new());

    for r in &report.checks {
        lines.push(format!("## [{}] {}\n", r.status, r.name));
        lines.push(format!("**Status:** {}  ", r.status));
        lines.push(format!("**Summary:** {}\n", r.summary));
        if !r.findings.is_empty() {
            lines.push("| Severity | File | Line | Description |".to_string());
            lines.push("|----------|------|------|-------------|".to_string());
            for f in r.findings.iter().take(MAX_FINDINGS) {
                let desc = f.description.replace('|', "\\|");
                lines.push(format!(
                    "| {} | `{}` | {} | {} |",
                    f.severity,
                    f.file,
                    finding_line_cell(f),
                    desc
                ));
            }
            if r.findings.len() > MAX_FINDINGS {
                lines.push(format!(
                    "| ... | ... | ... | *({} more findings truncated)* |",
                    r.findings.len() - MAX_FINDINGS
                ));
            }
            lines.push(String::new());
        }
    }

    lines.push("---\n".to_string());
    lines.push(format!(
        "*Generated by crossaudit v{} for {} on {}*\n",
        env!("CARGO_PKG_VERSION"),
        meta.remediation_repo,
        meta.date
    ));
    lines.join("\n")
}

fn esc(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Generate a self-contained HTML report with embedded CSS.
pub fn generate_html(report: &Report) -> String {
    let meta = &report.metadata;
    let s = &report.summary;

    let mut parts: Vec<String> = Vec::new();
    parts.push(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Cross-Repo Reconciliation Report</title>
<style>
  :root { --pass: #28a745; --fail: #dc3545; --warn: #ffc107; --skip: #6c757d;
          --bg: #f8f9fa; --card: #fff; --border: #dee2e6; --text: #212529; }
  body { font-family: -apple-system,"Segoe UI",Roboto,Helvetica,Arial,sans-serif;
         background: var(--bg); color: var(--text); line-height: 1.5; padding: 2rem; }
  .container { max-width: 1100px; margin: 0 auto; }
  h1 { font-size: 1.75rem; margin-bottom: 0.5rem; }
  .meta { color: var(--skip); font-size: 0.9rem; margin-bottom: 1.5rem; }
  .meta span { margin-right: 1.5rem; }
  table { width: 100%; border-collapse: collapse; font-size: 0.875rem; }
  th, td { padding: 0.5rem 0.75rem; text-align: left; border-bottom: 1px solid var(--border); }
  th { background: var(--bg); font-weight: 600; }
  .card { background: var(--card); border: 1px solid var(--border); border-radius: 6px;
          margin-bottom: 1rem; padding: 0.75rem 1rem; }
  .badge { display: inline-block; padding: 0.15em 0.55em; border-radius: 4px;
           font-size: 0.75rem; font-weight: 700; color: #fff; }
  .badge-pass { background: var(--pass); }
  .badge-fail { background: var(--fail); }
  .badge-warn { background: var(--warn); color: #212529; }
  .badge-skip { background: var(--skip); }
  .sev-error { color: var(--fail); font-weight: 600; }
  .sev-warning { color: #b8860b; font-weight: 600; }
  .sev-info { color: #0c7c84; font-weight: 600; }
  .file-col { font-family: SFMono-Regular,Menlo,Consolas,monospace; font-size: 0.8rem; }
  footer { margin-top: 2rem; text-align: center; font-size: 0.8rem; color: var(--skip); }
</style>
</head>
<body>
<div class="container">
"#
        .to_string(),
    );

    parts.push("<h1>Cross-Repo Reconciliation Report</h1>\n<div class='meta'>".to_string());
    parts.push(format!(
        "<span><b>Remediation:</b> {}</span><span><b>Audit:</b> {}</span><span><b>Date:</b> {}</span><br>",
        esc(&meta.remediation_repo),
        esc(&meta.audit_repo),
        esc(&meta.date)
    ));
    parts.push(format!(
        "<span><b>Prefix:</b> {}</span><span><b>Dialect:</b> {}</span>",
        esc(&meta.benchmark_prefix),
        esc(&meta.dialect)
    ));
    if !meta.rule_id_prefix.is_empty() {
        parts.push(format!(
            "<span><b>Rule ID Prefix:</b> {}</span>",
            esc(&meta.rule_id_prefix)
        ));
    }
    if !meta.benchmark_version.is_empty() {
        parts.push(format!(
            "<span><b>Benchmark Version:</b> {}</span>",
            esc(&meta.benchmark_version)
        ));
    }
    parts.push("</div>\n".to_string());

    parts.push("<div class='card'><table>".to_string());
    parts.push("<tr><th>Total</th><th>Passed</th><th>Failed</th><th>Warnings</th><th>Skipped</th></tr>".to_string());
    parts.push(format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        s.total, s.passed, s.failed, s.warnings, s.skipped
    ));
    parts.push("</table></div>\n".to_string());

    for r in &report.checks {
        let badge_cls = format!("badge-{}", r.status.as_str().to_lowercase());
        parts.push("<div class='card'>".to_string());
        parts.push(format!(
            "<p><span class='badge {badge_cls}'>{}</span> <b>{}</b> — {}</p>",
            r.status,
            esc(&r.name),
            esc(&r.summary)
        ));
        if !r.findings.is_empty() {
            parts.push(
                "<table><tr><th>Severity</th><th>File</th><th>Line</th><th>Description</th></tr>"
                    .to_string(),
            );
            for f in r.findings.iter().take(MAX_FINDINGS) {
                parts.push(format!(
                    "<tr><td class='sev-{}'>{}</td><td class='file-col'>{}</td><td>{}</td><td>{}</td></tr>",
                    f.severity,
                    f.severity,
                    esc(&f.file),
                    finding_line_cell(f),
                    esc(&f.description)
                ));
            }
            if r.findings.len() > MAX_FINDINGS {
                parts.push(format!(
                    "<tr><td colspan='4'><em>({} more findings truncated)</em></td></tr>",
                    r.findings.len() - MAX_FINDINGS
                ));
            }
            parts.push("</table>".to_string());
        }
        parts.push("</div>\n".to_string());
    }

    parts.push(format!(
        "<footer>Generated by <b>crossaudit</b> v{} for <b>{}</b> on {}</footer>",
        env!("CARGO_PKG_VERSION"),
        esc(&meta.remediation_repo),
        esc(&meta.date)
    ));
    parts.push("</div>\n</body>\n</html>".to_string());
    parts.join("\n")
}
