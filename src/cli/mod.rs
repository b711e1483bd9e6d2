use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, stdin};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::{LedgerConfig, LedgerService, OwnerDirectory};
use crate::domain::{AccountId, IntegrityReport, format_money};
use crate::io::{Exporter, ScriptReport, ScriptRunner};

/// Coffer - in-memory account ledger
#[derive(Parser)]
#[command(name = "coffer")]
#[command(about = "Replay account operations against an exact-decimal ledger and audit the result")]
#[command(version)]
pub struct Cli {
    /// Ledger configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply an operation script and show the resulting balances
    Run {
        /// Script file (CSV: op,user,account,target,amount); "-" reads stdin
        script: String,

        /// Write the transaction log to this CSV file
        #[arg(long)]
        export_transactions: Option<PathBuf>,

        /// Write account balances to this CSV file
        #[arg(long)]
        export_balances: Option<PathBuf>,

        /// Print a full JSON snapshot instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Apply an operation script and check the ledger against its log
    Verify {
        /// Script file (CSV: op,user,account,target,amount); "-" reads stdin
        script: String,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        init_tracing(self.verbose, self.log_json);

        let config = match &self.config {
            Some(path) => LedgerConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => LedgerConfig::default(),
        };

        let directory = Arc::new(OwnerDirectory::new());
        let service = LedgerService::new(directory.clone()).with_config(config);

        match self.command {
            Commands::Run {
                script,
                export_transactions,
                export_balances,
                json,
            } => {
                let mut runner = ScriptRunner::new(&service, &directory);
                let report = runner.run(open_input(&script)?)?;
                let labels = runner.account_labels();

                let exporter = Exporter::new(&service);
                if json {
                    exporter.export_full_json(std::io::stdout())?;
                    println!();
                } else {
                    print_report(&report);
                    print_balances(&service, &labels);
                }

                if let Some(path) = export_transactions {
                    let count = exporter.export_transactions_csv(create_output(&path)?)?;
                    eprintln!("Exported {} transactions to {}", count, path.display());
                }
                if let Some(path) = export_balances {
                    let count = exporter.export_balances_csv(create_output(&path)?)?;
                    eprintln!("Exported {} balances to {}", count, path.display());
                }
            }

            Commands::Verify { script } => {
                let mut runner = ScriptRunner::new(&service, &directory);
                let report = runner.run(open_input(&script)?)?;
                print_report(&report);
                print_integrity(&service.check_integrity())?;
            }
        }

        Ok(())
    }
}

/// Install the global subscriber. Logs go to stderr; `RUST_LOG` overrides the level.
fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // Subsequent initialisation attempts are no-ops
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn open_input(path: &str) -> Result<Box<dyn Read>> {
    if path == "-" {
        return Ok(Box::new(stdin()));
    }
    let file = File::open(path).with_context(|| format!("Failed to open script: {}", path))?;
    Ok(Box::new(file))
}

fn create_output(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))
}

fn print_report(report: &ScriptReport) {
    println!("Applied: {}", report.applied);
    println!("Errors:  {}", report.errors.len());

    if !report.errors.is_empty() {
        println!("\nErrors:");
        for error in report.errors.iter().take(10) {
            let kind = error.kind.map(|k| format!("[{}] ", k)).unwrap_or_default();
            println!("  Line {}: {}{}", error.line, kind, error.error);
        }
        if report.errors.len() > 10 {
            println!("  ... and {} more errors", report.errors.len() - 10);
        }
    }
    println!();
}

fn print_balances(service: &LedgerService, labels: &HashMap<AccountId, String>) {
    let accounts = service.list_accounts();
    if accounts.is_empty() {
        println!("No accounts found.");
        return;
    }

    println!("{:<30} {:>15} {:>6}", "ACCOUNT", "BALANCE", "TXNS");
    println!("{}", "-".repeat(53));
    for account in accounts {
        let label = labels
            .get(&account.id)
            .cloned()
            .unwrap_or_else(|| account.name.clone());
        let count = service.transaction_history(account.id).len();
        println!(
            "{:<30} {:>15} {:>6}",
            truncate(&label, 30),
            format_money(account.balance()),
            count
        );
    }
}

fn print_integrity(report: &IntegrityReport) -> Result<()> {
    println!("Checking ledger integrity...\n");
    println!("Accounts:     {}", report.account_count);
    println!("Transactions: {}", report.record_count);
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
        return Ok(());
    }

    println!("Issues found:");
    for mismatch in &report.mismatches {
        println!(
            "  - {} ({}): balance {} but log replays to {}",
            mismatch.account_name,
            mismatch.account_id,
            format_money(mismatch.stored),
            mismatch
                .replayed
                .map(format_money)
                .unwrap_or_else(|| "overflow".to_string())
        );
    }
    if report.unpaired_transfers > 0 {
        println!("  - {} unpaired transfer legs", report.unpaired_transfers);
    }
    if report.has_sequence_gaps {
        println!("  - transaction sequence has gaps");
    }
    if report.orphan_records > 0 {
        println!(
            "  - {} records reference unknown accounts",
            report.orphan_records
        );
    }
    anyhow::bail!("Ledger integrity check failed");
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
