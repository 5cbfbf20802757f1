// peerguard/src/main.rs
//
// Peerguard: batch misconduct detection for peer-review platforms
//
// Two commands over a JSON snapshot ({submissions, reviews, profiles}):
//   scan   run detectors for a scope and print / dispatch the findings
//   risk   aggregate one user's anomalies into a risk score
//
// Usage:
//   peerguard scan --data snapshot.json
//   peerguard scan --data snapshot.json --scope reviewer:r-17 --json
//   peerguard risk --data snapshot.json --user u-42 --config peerguard.json

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use peerguard::anomaly::Severity;
use peerguard::engine::dispatcher::Dispatcher;
use peerguard::engine::{RiskLevel, RiskScore, ScanReport};
use peerguard::records::Snapshot;
use peerguard::{Anomaly, EngineConfig, MemoryStore, ScanEngine, Scope};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "peerguard",
    about   = "Anomaly and fraud detection for peer-review platforms",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[arg(long, global = true, help = "Engine configuration (JSON); PEERGUARD_* env vars override it")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run detectors over a scope
    Scan {
        #[arg(long, help = "Snapshot file (JSON)")]
        data: PathBuf,

        #[arg(long, default_value = "all",
              help = "all | submission:ID | reviewer:ID | user:ID")]
        scope: Scope,

        #[arg(long, help = "Append findings to JSONL files in this directory")]
        output: Option<PathBuf>,

        #[arg(long, help = "Print the full report as JSON instead of alerts")]
        json: bool,
    },
    /// Compute one user's risk score
    Risk {
        #[arg(long, help = "Snapshot file (JSON)")]
        data: PathBuf,

        #[arg(long)]
        user: String,

        #[arg(long, help = "Append HIGH-level scores to risk_alerts.jsonl in this directory")]
        output: Option<PathBuf>,
    },
}

// ── Output ────────────────────────────────────────────────────────────────────

fn severity_style(severity: Severity) -> (&'static str, &'static str) {
    match severity {
        Severity::High   => ("\x1b[91;1m", "🔴"),
        Severity::Medium => ("\x1b[93;1m", "🟡"),
        Severity::Low    => ("\x1b[96m",   "🔵"),
    }
}

fn print_alert(anomaly: &Anomaly) {
    let (color, icon) = severity_style(anomaly.severity());
    let reset = "\x1b[0m";
    let subjects = anomaly.subjects().iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ");

    println!("\n{}{} {} {}{}", color, icon, anomaly.severity(), anomaly.kind(), reset);
    println!("  Subjects: {}{}{}", color, subjects, reset);
    println!("  Detail  : {}", anomaly.description());
    println!("  Action  : \x1b[90m{}{}", anomaly.recommendation(), reset);
}

fn print_summary(report: &ScanReport, elapsed_ms: u128) {
    let c = &report.by_severity;
    println!(
        "\n\x1b[1m── scope={}  anomalies={}  high={}  medium={}  low={}  {}ms ──\x1b[0m",
        report.scope, report.total, c.high, c.medium, c.low, elapsed_ms
    );
    if !report.incomplete.is_empty() {
        let names = report.incomplete.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ");
        println!("\x1b[91m  incomplete detectors: {}\x1b[0m", names);
    }
    for s in &report.skipped {
        println!("\x1b[90m  skipped {} in {}: {}\x1b[0m", s.entity, s.detector, s.reason);
    }
}

fn print_risk(risk: &RiskScore) {
    let color = match risk.level {
        RiskLevel::High   => "\x1b[91;1m",
        RiskLevel::Medium => "\x1b[93;1m",
        RiskLevel::Low    => "\x1b[92m",
    };
    let reset = "\x1b[0m";
    println!("\n{}{} risk{}", color, risk.level, reset);
    println!("  User     : {}{}{}", color, risk.user_id, reset);
    println!("  Score    : {}{:.2}{}", color, risk.score, reset);
    println!("  Anomalies: {}", risk.anomaly_count);
    for a in &risk.contributing_anomalies {
        println!("    - {} {}", a.kind(), a.description());
    }
}

// ── Setup ─────────────────────────────────────────────────────────────────────

fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    info!(
        "Snapshot {}: {} submissions, {} reviews, {} profiles",
        path.display(),
        snapshot.submissions.len(),
        snapshot.reviews.len(),
        snapshot.profiles.len()
    );
    Ok(snapshot)
}

fn build_engine(data: &Path, config: Option<&Path>) -> Result<ScanEngine> {
    let cfg = EngineConfig::load(config)?;
    let store = Arc::new(MemoryStore::from_snapshot(load_snapshot(data)?));
    Ok(ScanEngine::new(store, cfg)?)
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("peerguard=info".parse()?))
        .with_writer(std::io::stderr)
        .compact().init();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan { data, scope, output, json } => {
            let engine = build_engine(&data, cli.config.as_deref())?;
            let start = Instant::now();
            let report = engine.scan(scope).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for anomaly in report.anomalies() {
                    print_alert(anomaly);
                }
                print_summary(&report, start.elapsed().as_millis());
            }

            if let Some(dir) = output {
                Dispatcher::new(dir)?.dispatch_report(&report).await?;
            }
        }

        Command::Risk { data, user, output } => {
            let engine = build_engine(&data, cli.config.as_deref())?;
            let risk = engine.risk_score(&user).await?;
            print_risk(&risk);

            if let Some(dir) = output {
                Dispatcher::new(dir)?.dispatch_risk(&risk).await?;
            }
        }
    }
    Ok(())
}
