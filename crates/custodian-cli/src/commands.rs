use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use custodian_ledger::{
    ActionRequest, CategoryCounts, Custodian, EntryFilter, IntegrityReport, LedgerConfig,
    LedgerEntry, LedgerStats,
};

use crate::cli::*;

/// Exit status of `verify` when the chain is broken.
const EXIT_CHAIN_BROKEN: u8 = 2;

/// How a successfully executed command ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Done,
    ChainBroken,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Done => ExitCode::SUCCESS,
            Status::ChainBroken => ExitCode::from(EXIT_CHAIN_BROKEN),
        }
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    execute(cli).map(ExitCode::from)
}

fn execute(cli: Cli) -> anyhow::Result<Status> {
    let config = resolve_config(&cli)?;
    let ledger = Custodian::open(config).context("failed to open ledger")?;
    let format = cli.format;

    match cli.command {
        Command::Record(args) => cmd_record(&ledger, args, format),
        Command::Recent(args) => cmd_recent(&ledger, args, format),
        Command::Search(args) => cmd_search(&ledger, args, format),
        Command::Counts => cmd_counts(&ledger, format),
        Command::Stats => cmd_stats(&ledger, format),
        Command::Verify => cmd_verify(&ledger, format),
        Command::Show(args) => cmd_show(&ledger, args, format),
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<LedgerConfig> {
    let config = match &cli.config {
        Some(path) => LedgerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    Ok(match &cli.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    })
}

fn cmd_record(ledger: &Custodian, args: RecordArgs, format: OutputFormat) -> anyhow::Result<Status> {
    let mut request = ActionRequest::categorized(
        args.action_type,
        args.action,
        args.target,
        args.details,
        args.user,
    );
    if let Some(tab) = args.tab {
        request = request.with_tab_source(tab);
    }
    if let Some(smart_id) = args.smart_id {
        request = request.with_smart_id(smart_id);
    }
    for (key, value) in args.metadata {
        request = request.with_metadata(key, value);
    }

    let entry = ledger.record_action(request).context("failed to record action")?;
    match format {
        OutputFormat::Json => print_json(&entry)?,
        OutputFormat::Text => {
            println!("{} Recorded {}", "✓".green().bold(), entry.entry_id.to_string().yellow().bold());
            println!("  Hash: {}", entry.entry_hash.to_hex().dimmed());
        }
    }
    Ok(Status::Done)
}

fn cmd_recent(ledger: &Custodian, args: RecentArgs, format: OutputFormat) -> anyhow::Result<Status> {
    let recent = ledger.get_recent_activities(args.limit)?;
    match format {
        OutputFormat::Json => print_json(&recent)?,
        OutputFormat::Text => {
            if recent.activities.is_empty() {
                println!("Ledger is empty.");
            }
            for entry in &recent.activities {
                print_entry_line(entry);
            }
            println!(
                "{}",
                format!("({} of {} entries)", recent.activities.len(), recent.total).dimmed()
            );
        }
    }
    Ok(Status::Done)
}

fn cmd_search(ledger: &Custodian, args: SearchArgs, format: OutputFormat) -> anyhow::Result<Status> {
    let filter = EntryFilter {
        action_type: args.action_type,
        action: args.action,
        user_id: args.user,
        tab_source: args.tab,
        search: args.query,
        since: args.since,
        until: args.until,
        offset: args.offset,
        limit: args.limit,
    };
    let found = ledger.query().get_filtered(&filter)?;
    match format {
        OutputFormat::Json => print_json(&found)?,
        OutputFormat::Text => {
            if found.entries.is_empty() {
                println!("No matching entries.");
            }
            for entry in &found.entries {
                print_entry_line(entry);
            }
        }
    }
    Ok(Status::Done)
}

fn cmd_counts(ledger: &Custodian, format: OutputFormat) -> anyhow::Result<Status> {
    let counts = ledger.get_counts()?;
    match format {
        OutputFormat::Json => print_json(&counts)?,
        OutputFormat::Text => print_counts(&counts),
    }
    Ok(Status::Done)
}

fn cmd_stats(ledger: &Custodian, format: OutputFormat) -> anyhow::Result<Status> {
    let stats = ledger.query().get_stats()?;
    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Text => print_stats(&stats),
    }
    Ok(Status::Done)
}

fn cmd_verify(ledger: &Custodian, format: OutputFormat) -> anyhow::Result<Status> {
    let report = ledger.verify_integrity()?;
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }
    Ok(if report.valid {
        Status::Done
    } else {
        Status::ChainBroken
    })
}

fn cmd_show(ledger: &Custodian, args: ShowArgs, format: OutputFormat) -> anyhow::Result<Status> {
    let entry = ledger
        .query()
        .get_entry(args.entry)?
        .with_context(|| format!("no entry {}", args.entry))?;
    match format {
        OutputFormat::Json => print_json(&entry)?,
        OutputFormat::Text => print_entry(&entry),
    }
    Ok(Status::Done)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_entry_line(entry: &LedgerEntry) {
    let smart_id = entry
        .smart_id
        .as_deref()
        .map(|s| format!(" [{s}]"))
        .unwrap_or_default();
    println!(
        "{} {} {}.{} {}{} by {}",
        entry.entry_id.to_string().yellow(),
        entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        entry.action_type.as_str().cyan(),
        entry.action,
        entry.target.bold(),
        smart_id,
        entry.user_id.green(),
    );
}

fn print_entry(entry: &LedgerEntry) {
    println!("Entry {}", entry.entry_id.to_string().yellow().bold());
    println!("  Time:     {}", entry.timestamp.to_rfc3339());
    println!("  Type:     {}", entry.action_type.as_str().cyan());
    println!("  Action:   {}", entry.action);
    println!("  Target:   {}", entry.target.bold());
    println!("  Details:  {}", entry.details);
    println!("  User:     {}", entry.user_id.green());
    if let Some(smart_id) = &entry.smart_id {
        println!("  SMART ID: {smart_id}");
    }
    println!("  Tab:      {}", entry.tab_source);
    for (key, value) in &entry.metadata {
        println!("  Meta:     {key} = {value}");
    }
    println!("  Previous: {}", entry.previous_hash.to_hex().dimmed());
    println!("  Hash:     {}", entry.entry_hash.to_hex().dimmed());
}

fn print_counts(counts: &CategoryCounts) {
    for (action_type, n) in counts.iter() {
        println!("  {:<10} {}", action_type.as_str(), n);
    }
    println!("  {:<10} {}", "total", counts.total.to_string().bold());
}

fn print_stats(stats: &LedgerStats) {
    println!("Entries: {}", stats.total_entries.to_string().bold());
    if let (Some(first), Some(last)) = (stats.first_timestamp, stats.last_timestamp) {
        println!("Span:    {} .. {}", first.to_rfc3339(), last.to_rfc3339());
    }
    println!("Tail:    {}", stats.tail_hash.to_hex().dimmed());
    println!("By category:");
    print_counts(&stats.categories);
    if !stats.users.is_empty() {
        println!("By user:");
        for (user, n) in &stats.users {
            println!("  {:<10} {}", user.green(), n);
        }
    }
    if !stats.smart_ids.is_empty() {
        println!("By SMART ID:");
        for (smart_id, n) in &stats.smart_ids {
            println!("  {:<10} {}", smart_id, n);
        }
    }
}

fn print_report(report: &IntegrityReport) {
    if report.valid {
        println!("{} Hash chain integrity verified", "✓".green().bold());
        println!("  Entries: {}", report.checked.to_string().bold());
    } else {
        let at = report
            .broken_at
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".into());
        println!("{} Hash chain broken at {}", "✗".red().bold(), at.yellow().bold());
        println!("  Verified: {} of {}", report.checked, report.total);
        if let Some(failure) = &report.failure {
            println!("  Reason: {}", failure.red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(dir: &std::path::Path, args: &[&str]) -> Status {
        let mut argv = vec!["custodian", "--data-dir", dir.to_str().unwrap()];
        argv.extend_from_slice(args);
        execute(Cli::try_parse_from(argv).unwrap()).unwrap()
    }

    #[test]
    fn record_then_verify() {
        let dir = tempfile::tempdir().unwrap();
        let ok = run(
            dir.path(),
            &[
                "record", "--type", "node", "--action", "register", "--target", "Node-7",
                "--user", "alice", "--meta", "ip=10.0.0.7",
            ],
        );
        assert_eq!(ok, Status::Done);
        assert_eq!(run(dir.path(), &["verify"]), Status::Done);
        assert_eq!(run(dir.path(), &["--format", "json", "counts"]), Status::Done);
        assert_eq!(run(dir.path(), &["show", "1"]), Status::Done);

        let ledger = Custodian::open(LedgerConfig::default().with_data_dir(dir.path())).unwrap();
        let entry = ledger.get_recent_activities(1).unwrap().activities.remove(0);
        assert_eq!(entry.tab_source, "nodes");
        assert_eq!(entry.metadata.len(), 1);
    }

    #[test]
    fn show_missing_entry_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "custodian",
            "--data-dir",
            dir.path().to_str().unwrap(),
            "show",
            "led#3",
        ])
        .unwrap();
        assert!(execute(cli).is_err());
    }
}
