//! vault2git - Vault to git migration driver
//!
//! The `vault2git` command inspects and advances a resumable migration.
//!
//! ## Commands
//!
//! - `status`: Show the last processed transaction and pending work
//! - `pending`: List pending transactions in order
//! - `start-point`: Resolve the fork point for a branch
//! - `record`: Record the commit a transaction produced
//! - `graft`: Repair merges whose source branch was committed late
//! - `author`: Resolve the git identity for a legacy login

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use vault2git_core::metrics::METRICS;
use vault2git_core::obs::MigrationSpan;
use vault2git_core::telemetry;
use vault2git_core::{
    is_git_repo, read_transactions, ConversionState, GitCli, LoadReport, MigrationConfig,
    RenameTables, TargetSink, TransactionInput, TransactionRecord, TxId,
};

#[derive(Parser)]
#[command(name = "vault2git")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resumable Vault to git migration engine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Result format on stdout
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Persisted mapping state file
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Transaction stream (JSON Lines) from the legacy source
    #[arg(long, global = true)]
    transactions: Option<PathBuf>,

    /// Target git working tree
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Author/branch rename table (TOML)
    #[arg(long, global = true)]
    renames: Option<PathBuf>,

    /// Branch used when a source branch has no commit yet
    #[arg(long, global = true)]
    default_branch: Option<String>,

    /// Email domain for unmapped logins
    #[arg(long, global = true)]
    git_domain: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the last processed transaction and pending work
    Status,

    /// List pending transactions in ordinal order
    Pending {
        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Resolve the fork point for a new branch
    StartPoint {
        /// Legacy branch the new branch forks from
        branch: String,

        /// Create this git branch at the fork point
        #[arg(long)]
        create: Option<String>,
    },

    /// Record the commit a transaction produced and save state
    Record {
        /// Ordinal transaction id
        #[arg(long)]
        tx: u64,

        /// Commit hash produced for the transaction
        #[arg(long)]
        commit: String,

        /// Parent hashes of the commit
        #[arg(long = "parent")]
        parents: Vec<String>,
    },

    /// Graft late merge parents and save state
    Graft,

    /// Resolve the git author for a legacy login
    Author {
        /// Legacy login
        login: String,
    },
}

/// One loaded migration: engine state plus the repository it targets.
struct Session {
    config: MigrationConfig,
    state: ConversionState,
    sink: GitCli,
    report: LoadReport,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing(cli.json, telemetry::verbosity(cli.verbose));
    let (_run_id, _span) = MigrationSpan::enter_new();

    let config = config_from_cli(&cli);
    let output = cli.output;

    let result = match cli.command {
        Commands::Author { ref login } => {
            let renames = load_renames(config.rename_file.as_deref())?;
            cmd_author(&renames, login, &config.git_domain, output)
        }
        Commands::Status => {
            let session = open_session(config, cli.transactions.as_deref(), &cli.repo)?;
            cmd_status(&session, output)
        }
        Commands::Pending { limit } => {
            let session = open_session(config, cli.transactions.as_deref(), &cli.repo)?;
            cmd_pending(&session, limit, output)
        }
        Commands::StartPoint {
            ref branch,
            ref create,
        } => {
            let mut session = open_session(config, cli.transactions.as_deref(), &cli.repo)?;
            cmd_start_point(&mut session, branch, create.as_deref(), output)
        }
        Commands::Record {
            tx,
            ref commit,
            ref parents,
        } => {
            let mut session = open_session(config, cli.transactions.as_deref(), &cli.repo)?;
            cmd_record(&mut session, TxId(tx), commit, parents, output)
        }
        Commands::Graft => {
            let mut session = open_session(config, cli.transactions.as_deref(), &cli.repo)?;
            cmd_graft(&mut session, output)
        }
    };
    METRICS.flush();
    result
}

fn config_from_cli(cli: &Cli) -> MigrationConfig {
    let mut config = MigrationConfig::from_env();
    if let Some(path) = &cli.state {
        config = config.with_state_file(path);
    }
    if let Some(path) = &cli.renames {
        config = config.with_rename_file(path);
    }
    if let Some(branch) = &cli.default_branch {
        config = config.with_default_branch(branch);
    }
    if let Some(domain) = &cli.git_domain {
        config = config.with_git_domain(domain);
    }
    config
}

fn load_renames(path: Option<&Path>) -> Result<RenameTables> {
    match path {
        Some(path) => RenameTables::load(path)
            .with_context(|| format!("Failed to load rename table: {:?}", path)),
        None => Ok(RenameTables::default()),
    }
}

fn load_transactions(path: Option<&Path>) -> Result<Vec<TransactionInput>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let file =
        File::open(path).with_context(|| format!("Failed to open transactions: {:?}", path))?;
    read_transactions(BufReader::new(file))
        .with_context(|| format!("Invalid transaction stream in {:?}", path))
}

fn open_session(
    config: MigrationConfig,
    transactions: Option<&Path>,
    repo: &Path,
) -> Result<Session> {
    if !is_git_repo(repo) {
        bail!("Not a git repository: {:?}", repo);
    }
    let renames = load_renames(config.rename_file.as_deref())?;
    let transactions = load_transactions(transactions)?;

    let mut sink = GitCli::new(repo);
    let log = sink
        .log_entries()
        .context("Failed to read target repository log")?;

    let mut state = ConversionState::from_config(&config);
    let report = state
        .load_state(renames, config.state_file.as_deref(), transactions, &log)
        .context("Failed to load migration state")?;

    Ok(Session {
        config,
        state,
        sink,
        report,
    })
}

fn save(session: &Session) -> Result<()> {
    match &session.config.state_file {
        Some(path) => session
            .state
            .save_state(path)
            .with_context(|| format!("Failed to save state to {:?}", path)),
        None => {
            warn!("no state file configured; mappings were not saved");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct StatusView<'a> {
    last_processed: Option<TxId>,
    pending: usize,
    mappings: usize,
    transactions: usize,
    load: &'a LoadReport,
}

fn status_view(session: &Session) -> StatusView<'_> {
    StatusView {
        last_processed: session.state.last_processed(),
        pending: session.state.pending_transactions().len(),
        mappings: session.state.mappings().len(),
        transactions: session.state.transactions().len(),
        load: &session.report,
    }
}

fn cmd_status(session: &Session, output: OutputFormat) -> Result<()> {
    let view = status_view(session);
    if output == OutputFormat::Json {
        return print_json(&view);
    }

    match view.last_processed {
        Some(tx) => println!("Last processed: {}", tx),
        None => println!("Last processed: (none)"),
    }
    println!("Pending:        {}", view.pending);
    println!("Mappings:       {}", view.mappings);
    println!("Transactions:   {}", view.transactions);
    println!(
        "Target log:     {} commits, {} replaced ({} forwarded), {} malformed",
        view.load.log_commits,
        view.load.log_replaced_skipped,
        view.load.log_replaced_forwarded,
        view.load.log_malformed
    );
    Ok(())
}

fn render_pending_line(record: &TransactionRecord) -> String {
    let mut line = format!(
        "{:>8}  {:<16} {}@{}",
        record.tx_id().0,
        record.branch(),
        record.path,
        record.version
    );
    if let Some(source) = record.merge_source() {
        line.push_str(&format!("  (merge from {})", source));
    }
    line
}

fn cmd_pending(session: &Session, limit: Option<usize>, output: OutputFormat) -> Result<()> {
    let pending = session.state.pending_transactions();
    let records: Vec<&TransactionRecord> = pending
        .values()
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    if output == OutputFormat::Json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No pending transactions");
        return Ok(());
    }
    for record in records {
        println!("{}", render_pending_line(record));
    }
    Ok(())
}

#[derive(Serialize)]
struct MappingView {
    tx_id: TxId,
    branch: String,
    commit: String,
}

fn cmd_start_point(
    session: &mut Session,
    branch: &str,
    create: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    let mapping = session
        .state
        .branch_start_point(branch)
        .with_context(|| format!("No fork point for branch '{}'", branch))?;
    let view = MappingView {
        tx_id: mapping.tx_id(),
        branch: mapping.branch().to_string(),
        commit: session.state.mapping_hex(mapping),
    };

    if let Some(name) = create {
        let name = session.state.branch_name(name);
        session
            .sink
            .create_branch(&name, &view.commit)
            .with_context(|| format!("Failed to create branch '{}'", name))?;
        info!(branch = %name, at = %view.commit, "branch created");
    }

    if output == OutputFormat::Json {
        return print_json(&view);
    }
    println!("{}", view.commit);
    Ok(())
}

fn cmd_record(
    session: &mut Session,
    tx_id: TxId,
    commit: &str,
    parents: &[String],
    output: OutputFormat,
) -> Result<()> {
    let commit_id = session
        .state
        .intern_commit_with_parents(commit, parents)
        .with_context(|| format!("Invalid commit hash for transaction {}", tx_id))?;
    let mapping = session
        .state
        .create_mapping(tx_id, commit_id)
        .with_context(|| format!("Failed to record transaction {}", tx_id))?
        .clone();
    let view = MappingView {
        tx_id: mapping.tx_id(),
        branch: mapping.branch().to_string(),
        commit: session.state.mapping_hex(&mapping),
    };
    save(session)?;

    if output == OutputFormat::Json {
        return print_json(&view);
    }
    println!("Recorded {} -> {} ({})", view.tx_id, view.commit, view.branch);
    Ok(())
}

fn cmd_graft(session: &mut Session, output: OutputFormat) -> Result<()> {
    let report = session
        .state
        .graft_pass(&mut session.sink)
        .context("Graft pass failed")?;
    save(session)?;

    if output == OutputFormat::Json {
        return print_json(&report);
    }
    println!(
        "Examined {} mappings, {} merges, {} grafted, {} already parented",
        report.examined,
        report.merges_seen,
        report.grafted.len(),
        report.already_parented
    );
    for outcome in &report.grafted {
        println!(
            "  {}: {} -> {}",
            outcome.tx_id, outcome.original, outcome.replacement
        );
    }
    for (tx_id, source) in &report.missing_frontier {
        println!("  {}: no commit on source branch '{}'", tx_id, source);
    }
    Ok(())
}

fn cmd_author(
    renames: &RenameTables,
    login: &str,
    domain: &str,
    output: OutputFormat,
) -> Result<()> {
    let identity = renames.author(login, domain);
    if output == OutputFormat::Json {
        return print_json(&identity);
    }
    println!("{} <{}>", identity.name, identity.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_apply_to_subcommands() {
        let cli = Cli::try_parse_from([
            "vault2git",
            "pending",
            "--limit",
            "5",
            "--state",
            "state.json",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.state, Some(PathBuf::from("state.json")));
        assert!(matches!(cli.command, Commands::Pending { limit: Some(5) }));
    }

    #[test]
    fn record_accepts_repeated_parents() {
        let cli = Cli::try_parse_from([
            "vault2git",
            "record",
            "--tx",
            "12",
            "--commit",
            "abc",
            "--parent",
            "p1",
            "--parent",
            "p2",
        ])
        .unwrap();
        match cli.command {
            Commands::Record { tx, parents, .. } => {
                assert_eq!(tx, 12);
                assert_eq!(parents, vec!["p1".to_string(), "p2".to_string()]);
            }
            _ => panic!("expected record"),
        }
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "vault2git",
            "status",
            "--default-branch",
            "trunk",
            "--git-domain",
            "corp.example",
            "--renames",
            "renames.toml",
        ])
        .unwrap();
        let config = config_from_cli(&cli);
        assert_eq!(config.default_branch, "trunk");
        assert_eq!(config.git_domain, "corp.example");
        assert_eq!(config.rename_file, Some(PathBuf::from("renames.toml")));
    }

    #[test]
    fn transactions_file_is_read_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.jsonl");
        std::fs::write(
            &path,
            "{\"tx_id\": 4, \"branch\": \"dev\"}\n\n{\"tx_id\": 2}\n",
        )
        .unwrap();
        let inputs = load_transactions(Some(path.as_path())).unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(load_transactions(None).unwrap().is_empty());
        assert!(load_transactions(Some(dir.path().join("missing.jsonl").as_path())).is_err());
    }

    #[test]
    fn pending_line_mentions_merge_source() {
        let mut record = TransactionRecord::new(TxId(42), "master");
        record.path = "$/Proj".to_string();
        record.version = 7;
        record.merged_from = Some("dev".to_string());
        let line = render_pending_line(&record);
        assert!(line.contains("42"));
        assert!(line.contains("$/Proj@7"));
        assert!(line.ends_with("(merge from dev)"));
    }

    #[test]
    fn open_session_rejects_non_repository() {
        let dir = tempfile::tempdir().unwrap();
        let config = MigrationConfig::from_env();
        assert!(open_session(config, None, dir.path()).is_err());
    }
}
