use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use sms_ledger::input::{load_known_hashes, parse_timestamp};
use sms_ledger::{
    analyze_senders, audit_log, classify, load_messages, render_sender_report, write_log,
    BatchScanner, ClassificationContext, RawMessage,
};

#[derive(Parser)]
#[command(name = "sms-ledger", version, about = "Turn bank notification messages into categorized ledger transactions.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a single message and print the outcome as JSON.
    Classify {
        /// Sender id, e.g. VM-HDFCBK
        #[arg(long)]
        sender: String,
        /// Message body
        #[arg(long)]
        body: String,
        /// RFC 3339 timestamp or epoch millis (default: now)
        #[arg(long)]
        timestamp: Option<String>,
        /// Context snapshot JSON (rules, accounts, memory, config)
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// Scan a JSONL or CSV export of messages.
    Scan {
        /// Messages file (.jsonl or .csv)
        input: PathBuf,
        /// Context snapshot JSON
        #[arg(long)]
        context: Option<PathBuf>,
        /// File of already-persisted duplicate keys, one per line
        #[arg(long = "known-hashes")]
        known_hashes: Option<PathBuf>,
        /// Write the JSONL decision log here
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Per-sender message counts with samples (markdown).
    Senders {
        /// Messages file (.jsonl or .csv)
        input: PathBuf,
    },
    /// Audit a decision log and list records needing review.
    Audit {
        /// Decision log (JSONL)
        log: PathBuf,
        /// Maximum issues to list
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            sender,
            body,
            timestamp,
            context,
        } => run_classify(sender, body, timestamp.as_deref(), context.as_deref()),
        Commands::Scan {
            input,
            context,
            known_hashes,
            log,
        } => run_scan(&input, context.as_deref(), known_hashes.as_deref(), log.as_deref()),
        Commands::Senders { input } => run_senders(&input),
        Commands::Audit { log, limit } => run_audit(&log, limit),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_context(path: Option<&Path>) -> Result<ClassificationContext> {
    match path {
        Some(path) => ClassificationContext::from_file(path),
        None => Ok(ClassificationContext::new()),
    }
}

fn run_classify(sender: String, body: String, timestamp: Option<&str>, context: Option<&Path>) -> Result<()> {
    let context = load_context(context)?;
    let timestamp: DateTime<Utc> = match timestamp {
        Some(raw) => parse_timestamp(raw).context("Invalid --timestamp")?,
        None => Utc::now(),
    };

    let outcome = classify(&RawMessage::new(sender, body, timestamp), &context);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn run_scan(input: &Path, context: Option<&Path>, known_hashes: Option<&Path>, log: Option<&Path>) -> Result<()> {
    let context = load_context(context)?;
    let messages = load_messages(input)?;
    println!("📂 Loaded {} messages from {:?}", messages.len(), input);

    let mut scanner = BatchScanner::new(context);
    if let Some(path) = known_hashes {
        let keys = load_known_hashes(path)?;
        println!("🔑 Preloaded {} known hashes", keys.len());
        scanner = scanner.with_known_hashes(keys);
    }

    let report = scanner.scan(&messages);
    println!("\n📊 {}", report.summary());

    for failure in &report.failures {
        println!("❌ message {} ({}): {}", failure.index, failure.sender, failure.error);
    }
    for source in &report.salary_sources {
        println!("💼 New salary source: {} / {}", source.institution_code, source.sender_name);
    }

    let links = scanner.pair(&report.accepted);
    println!("🔗 Pairing links: {}", links.len());
    for link in &links {
        println!(
            "   {} {} -> {} ({:.2}) {}",
            link.link_kind.as_str(),
            link.primary_id,
            link.secondary_id,
            link.confidence,
            link.reason
        );
    }

    if let Some(path) = log {
        let written = write_log(path, &report.accepted)?;
        println!("\n📒 Wrote {} decision records to {:?}", written, path);
    }

    Ok(())
}

fn run_senders(input: &Path) -> Result<()> {
    let messages = load_messages(input)?;
    let report = analyze_senders(messages.iter().map(|m| (m.sender.as_str(), m.body.as_str())));
    print!("{}", render_sender_report(&report));
    Ok(())
}

fn run_audit(log: &Path, limit: usize) -> Result<()> {
    let report = audit_log(log).with_context(|| format!("Audit failed for {:?}", log))?;
    print!("{}", report.render(limit));
    Ok(())
}
