use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use custodian_ledger::{ActionType, EntryId, MetadataValue};

#[derive(Parser)]
#[command(
    name = "custodian",
    about = "Custodian: tamper-evident audit ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the ledger file (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record an action
    Record(RecordArgs),
    /// Show the most recent entries
    Recent(RecentArgs),
    /// Search entries
    Search(SearchArgs),
    /// Show entry counts per category
    Counts,
    /// Show ledger statistics
    Stats,
    /// Verify hash chain integrity
    Verify,
    /// Show a single entry
    Show(ShowArgs),
}

#[derive(Args)]
pub struct RecordArgs {
    #[arg(long = "type")]
    pub action_type: ActionType,
    #[arg(long)]
    pub action: String,
    #[arg(long)]
    pub target: String,
    #[arg(long, default_value = "")]
    pub details: String,
    #[arg(long)]
    pub user: String,
    #[arg(long)]
    pub smart_id: Option<String>,
    /// Metadata as key=value; values are typed (null, true, 42, 1.5, text)
    #[arg(long = "meta", value_parser = parse_meta)]
    pub metadata: Vec<(String, MetadataValue)>,
    /// Source tab; defaults to the category's usual tab
    #[arg(long)]
    pub tab: Option<String>,
}

#[derive(Args)]
pub struct RecentArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct SearchArgs {
    #[arg(long = "type")]
    pub action_type: Option<ActionType>,
    #[arg(long)]
    pub action: Option<String>,
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub tab: Option<String>,
    /// Case-insensitive text in target, details or smart id
    #[arg(short, long)]
    pub query: Option<String>,
    /// RFC 3339 lower time bound (inclusive)
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,
    /// RFC 3339 upper time bound (inclusive)
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,
    #[arg(long, default_value = "0")]
    pub offset: usize,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Entry id, as `led#N` or `N`
    pub entry: EntryId,
}

fn parse_meta(s: &str) -> Result<(String, MetadataValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err("metadata key must not be empty".into());
    }
    Ok((key.to_string(), MetadataValue::infer(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_record() {
        let cli = Cli::try_parse_from([
            "custodian", "record", "--type", "node", "--action", "register", "--target", "Node-7",
            "--details", "Registered Node", "--user", "alice", "--smart-id", "NOD-00007",
            "--meta", "ip=10.0.0.7", "--meta", "port=8080",
        ])
        .unwrap();
        if let Command::Record(args) = cli.command {
            assert_eq!(args.action_type, ActionType::Node);
            assert_eq!(args.smart_id, Some("NOD-00007".into()));
            assert_eq!(
                args.metadata,
                vec![
                    ("ip".to_string(), MetadataValue::Text("10.0.0.7".into())),
                    ("port".to_string(), MetadataValue::Integer(8080)),
                ]
            );
            assert!(args.tab.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_record_rejects_unknown_type() {
        assert!(Cli::try_parse_from([
            "custodian", "record", "--type", "spaceship", "--action", "a", "--target", "t",
            "--user", "u",
        ])
        .is_err());
    }

    #[test]
    fn parse_record_rejects_bad_meta() {
        assert!(Cli::try_parse_from([
            "custodian", "record", "--type", "hub", "--action", "a", "--target", "t",
            "--user", "u", "--meta", "novalue",
        ])
        .is_err());
    }

    #[test]
    fn parse_recent() {
        let cli = Cli::try_parse_from(["custodian", "recent", "-n", "5"]).unwrap();
        if let Command::Recent(args) = cli.command {
            assert_eq!(args.limit, 5);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_search() {
        let cli = Cli::try_parse_from([
            "custodian", "search", "--type", "modules", "--query", "billing", "--since",
            "2026-03-01T00:00:00Z", "--offset", "10",
        ])
        .unwrap();
        if let Command::Search(args) = cli.command {
            assert_eq!(args.action_type, Some(ActionType::Module));
            assert_eq!(args.query, Some("billing".into()));
            assert!(args.since.is_some());
            assert_eq!(args.offset, 10);
            assert_eq!(args.limit, 20);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_show() {
        let cli = Cli::try_parse_from(["custodian", "show", "led#12"]).unwrap();
        if let Command::Show(args) = cli.command {
            assert_eq!(args.entry, EntryId::new(12));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_verify() {
        let cli = Cli::try_parse_from(["custodian", "verify"]).unwrap();
        assert!(matches!(cli.command, Command::Verify));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "custodian", "counts", "--data-dir", "/tmp/ledger", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/ledger")));
    }
}
