//! Crossaudit CLI binary entry point.
//! Delegates to the validate pipeline and prints/writes reports.

mod checks;
mod cli;
mod config;
mod detect;
mod extract;
mod models;
mod normalize;
mod output;
mod patterns;
mod utils;
mod validate;

use clap::Parser;
use cli::{Cli, Commands, DialectArg};
use models::report::OverallStatus;
use patterns::Dialect;
use std::path::PathBuf;

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Check {
            remediation,
            audit,
            dialect,
            format,
            output,
            report,
            skip,
            only,
            strict,
            console,
            no_report,
            verbose,
        } => {
            let remediation_dir = PathBuf::from(&remediation);
            if !remediation_dir.is_dir() {
                eprintln!(
                    "{} {}",
                    utils::error_prefix(),
                    format!("remediation directory not found: {remediation}")
                );
                std::process::exit(2);
            }

            let audit_dir = match audit {
                Some(a) => PathBuf::from(a),
                None => match config::discover_audit_repo(&remediation_dir) {
                    Some(found) => {
                        eprintln!(
                            "{} {}",
                            utils::note_prefix(),
                            format!("Using audit repo: {}", found.display())
                        );
                        found
                    }
                    None => {
                        eprintln!(
                            "{} {}",
                            utils::error_prefix(),
                            "could not auto-discover audit repo; pass --audit"
                        );
                        std::process::exit(2);
                    }
                },
            };

            let eff = config::resolve_effective(
                &remediation_dir,
                output.as_deref(),
                format.as_deref(),
                strict,
                skip.as_deref(),
                only.as_deref(),
            );
            if config::load_config(&remediation_dir).is_none() && verbose {
                eprintln!(
                    "{} {}",
                    utils::note_prefix(),
                    "No crossaudit.toml found; using defaults."
                );
            }

            let dialect_override = match dialect {
                DialectArg::Auto => None,
                DialectArg::Section => Some(Dialect::Section),
                DialectArg::IdRange => Some(Dialect::IdRange),
            };

            let run_report = match validate::run(&validate::RunOptions {
                remediation_dir: &remediation_dir,
                audit_dir: &audit_dir,
                dialect_override,
                skip: &eff.skip,
                only: &eff.only,
                verbose,
            }) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("{} {}", utils::error_prefix(), e);
                    std::process::exit(2);
                }
            };

            if console {
                println!("{}", output::generate_report(&run_report, &eff.format));
            } else {
                output::print_report(&run_report, &eff.output);
            }

            if !no_report {
                let ext = match eff.format.as_str() {
                    "json" => "json",
                    "html" => "html",
                    _ => "md",
                };
                let timestamp = chrono::Local::now().format("%Y-%m-%d_%H%M%S");
                let path = report.map(PathBuf::from).unwrap_or_else(|| {
                    PathBuf::from(format!(
                        "crossaudit_report_{}_{timestamp}.{ext}",
                        run_report.metadata.remediation_repo
                    ))
                });
                let content = output::generate_report(&run_report, &eff.format);
                match std::fs::write(&path, content) {
                    Ok(()) => eprintln!(
                        "{} {}",
                        utils::info_prefix(),
                        format!("Report written to: {}", path.display())
                    ),
                    Err(e) => {
                        eprintln!(
                            "{} {}",
                            utils::error_prefix(),
                            format!("failed to write report {}: {e}", path.display())
                        );
                        std::process::exit(2);
                    }
                }
            }

            match run_report.overall() {
                OverallStatus::Failing => std::process::exit(2),
                OverallStatus::Warning if eff.strict => std::process::exit(1),
                _ => {}
            }
        }
    }
}
