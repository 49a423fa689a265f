use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use linkvet_core::audit::{
    AuditObserver, AuditOptions, BookmarkAuditResult, SilentObserver, audit_bookmarks,
};
use linkvet_core::config::load_config;
use linkvet_core::ledger::{bookmark_history, open_ledger, record_report};
use linkvet_core::probe::{ProbeClient, ProbeClientConfig, UrlProbe};

const DEFAULT_CONFIG_PATH: &str = "linkvet.toml";
const DEFAULT_DB_PATH: &str = "linkvet.db";

#[derive(Debug, Parser)]
#[command(
    name = "linkvet",
    version,
    about = "Audit bookmark link health against a linkding-style repository"
)]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[arg(long, global = true, value_name = "PATH", help = "Config file path")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Audit ledger database path")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Fetch every bookmark, probe each URL, and reconcile health tags")]
    Audit(AuditArgs),
    #[command(about = "Probe a single URL and print its outcome")]
    Check(CheckArgs),
    #[command(about = "Print recent audit ledger rows for one bookmark")]
    History(HistoryArgs),
}

#[derive(Debug, Args)]
struct AuditArgs {
    #[arg(long, help = "Probe and reconcile without writing tag updates")]
    dry_run: bool,
    #[arg(long, help = "Skip recording the pass in the audit ledger")]
    no_ledger: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    url: String,
}

#[derive(Debug, Args)]
struct HistoryArgs {
    bookmark_id: i64,
    #[arg(long, default_value_t = 20, help = "Maximum rows to print")]
    limit: usize,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

    match cli.command {
        Some(Commands::Audit(args)) => run_audit(&config_path, &db_path, cli.json, args),
        Some(Commands::Check(args)) => run_check(&config_path, cli.json, args),
        Some(Commands::History(args)) => run_history(&db_path, cli.json, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

struct ConsoleObserver;

impl AuditObserver for ConsoleObserver {
    fn page_fetched(&mut self, fetched_so_far: usize) {
        println!("Fetched {fetched_so_far} bookmarks so far...");
    }

    fn fetch_completed(&mut self, total: usize) {
        println!("Total bookmarks fetched: {total}");
    }

    fn bookmark_audited(&mut self, result: &BookmarkAuditResult) {
        if result.outcome == "ok" {
            println!("Bookmark {} \u{2705} {}", result.id, result.url);
        } else {
            println!(
                "Bookmark {} \u{274c} {} {}",
                result.id, result.outcome, result.url
            );
        }
        if result.action == "error"
            && let Some(detail) = &result.detail
        {
            println!("Error updating bookmark {}: {detail}", result.id);
        }
    }
}

fn run_audit(config_path: &Path, db_path: &Path, json: bool, args: AuditArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let options = AuditOptions {
        dry_run: args.dry_run,
    };

    let report = if json {
        audit_bookmarks(&config, &options, &mut SilentObserver)?
    } else {
        audit_bookmarks(&config, &options, &mut ConsoleObserver)?
    };

    if !args.no_ledger {
        let connection = open_ledger(db_path)?;
        record_report(&connection, &report)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("reachable: {}", report.reachable);
    println!("broken: {}", report.broken);
    println!("updated: {}", report.updated);
    println!("unchanged: {}", report.unchanged);
    if report.dry_run {
        println!("skipped (dry run): {}", report.skipped);
    }
    if !report.errors.is_empty() {
        println!("update errors:");
        for error in &report.errors {
            println!("  - {error}");
        }
    }
    println!(
        "requests: {} repository, {} probes",
        report.request_count, report.probe_count
    );
    Ok(())
}

fn run_check(config_path: &Path, json: bool, args: CheckArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let mut probe = ProbeClient::new(ProbeClientConfig::from_config(&config))?;
    let outcome = probe.probe(&args.url);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "url": args.url,
                "outcome": outcome.label(),
                "reachable": outcome.is_reachable(),
            }))?
        );
        return Ok(());
    }

    if outcome.is_reachable() {
        println!("{} \u{2705} ok", args.url);
    } else {
        println!("{} \u{274c} {}", args.url, outcome.label());
    }
    Ok(())
}

fn run_history(db_path: &Path, json: bool, args: HistoryArgs) -> Result<()> {
    let connection = open_ledger(db_path)?;
    let history = bookmark_history(&connection, args.bookmark_id, args.limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("no audit history for bookmark {}", args.bookmark_id);
        return Ok(());
    }
    for record in &history {
        println!(
            "{} {} {} {}",
            record.checked_at_unix, record.outcome, record.action, record.url
        );
    }
    Ok(())
}
