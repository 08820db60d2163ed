//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "crossaudit",
    version,
    about = "Cross-repo reconciliation for remediation + audit repo pairs",
    long_about = "Crossaudit — reconcile a remediation role against its audit repo.\n\nAuto-detects the benchmark prefix and naming dialect, extracts rule toggles,\ntask metadata, and audit assertions from both repositories, and runs a\nbattery of consistency checks.\n\nConfiguration precedence: CLI > crossaudit.toml > defaults.",
    after_help = "Examples:\n  crossaudit check -r ../RHEL9-CIS\n  crossaudit check -r ../Private-AMAZON2023-STIG -a ../AMAZON2023-STIG-Audit\n  crossaudit check -r ../RHEL9-CIS --format json --console --no-report\n  crossaudit check -r ../RHEL9-CIS --only version_consistency,toggle_sync",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
/// Dialect selection for the check command.
pub enum DialectArg {
    /// Infer from the declarations file
    Auto,
    /// Hierarchical section numbering (prefix_rule_1_1_1_1)
    Section,
    /// Fixed-width numeric rule IDs (prefix_000100)
    IdRange,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current crossaudit version.")]
    Version,
    /// Reconcile a remediation repo against its audit repo
    #[command(
        about = "Run the reconciliation check battery",
        long_about = "Detect the benchmark prefix and dialect, extract identifier maps from\nboth repositories, run all consistency checks, and write a report.\nExit codes: 0 clean, 1 warnings with --strict, 2 failures or precondition errors.",
        after_help = "Check keys for --skip / --only:\n  toggle_sync, audit_coverage, rule_id_match, rule_key_match,\n  category_alignment, version_consistency, include_coverage,\n  config_parity, template_var_sync, audit_vars_completeness,\n  toggle_value_sync, severity_directory, block_pairing,\n  when_toggle_alignment"
    )]
    Check {
        #[arg(short = 'r', long, help = "Path to the remediation repo")]
        remediation: String,
        #[arg(
            short = 'a',
            long,
            help = "Path to the audit repo (auto-discovered if omitted)"
        )]
        audit: Option<String>,
        #[arg(long, value_enum, default_value = "auto", help = "Naming dialect")]
        dialect: DialectArg,
        #[arg(long, help = "Report format: md|json|html (default: md)")]
        format: Option<String>,
        #[arg(long, help = "Console output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(short = 'o', long, help = "Report file path (default: timestamped)")]
        report: Option<String>,
        #[arg(long, help = "Comma-separated check keys to skip")]
        skip: Option<String>,
        #[arg(long, help = "Comma-separated check keys to run exclusively")]
        only: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Exit non-zero on warnings")]
        strict: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Print the report to stdout")]
        console: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Skip writing the report file")]
        no_report: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Print verbose progress to stderr")]
        verbose: bool,
    },
}
