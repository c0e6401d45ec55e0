//! mongo-topology - Topology as code for MongoDB
//!
//! Command-line entry point:
//! - `diff`   compare two topology files (CONTROL vs TEST)
//! - `plan`   compare a live cluster against its topology file, no writes
//! - `sync`   additively create missing users and indexes on a live cluster
//! - `export` introspect a live cluster into a topology file

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use mongo_topology::config::{LogConfig, LogFormat, Settings};
use mongo_topology::connection::{ClusterConnection, MongoAdmin};
use mongo_topology::error::not_found_error;
use mongo_topology::introspection::ClusterScanner;
use mongo_topology::loader::{parse_config_file, render_config};
use mongo_topology::models::Cluster;
use mongo_topology::reconcile::{Outcome, ReconcileReport, Reconciler};
use mongo_topology::snapshot::{render_text, ClusterDiff, DiffEngine, DiffSummary};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "mongo-topology", version, about = "Diff and reconcile MongoDB cluster topologies")]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two topology files; clusters are paired by name
    Diff {
        /// Baseline topology
        #[arg(long)]
        control: PathBuf,
        /// Candidate topology
        #[arg(long)]
        test: PathBuf,
        /// Only compare this cluster
        #[arg(long)]
        cluster: Option<String>,
    },
    /// Show what `sync` would change on the live clusters of a topology file
    Plan {
        config: PathBuf,
        #[arg(long)]
        cluster: Option<String>,
    },
    /// Create missing users and indexes on the live clusters of a topology file
    Sync {
        config: PathBuf,
        #[arg(long)]
        cluster: Option<String>,
        /// Report planned creations without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Introspect a live cluster and print it as a topology file
    Export {
        /// Cluster name to record in the output
        #[arg(long)]
        name: String,
        /// Connection string (defaults to MONGODB_URI)
        #[arg(long)]
        uri: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffOutput<'a> {
    diff: &'a ClusterDiff,
    summary: DiffSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanOutput<'a> {
    diff: &'a ClusterDiff,
    summary: DiffSummary,
    report: &'a ReconcileReport,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    match cli.command {
        Command::Diff { control, test, cluster } => {
            run_diff(&control, &test, cluster.as_deref(), cli.format)
        }
        Command::Plan { config, cluster } => {
            run_plan(&settings, &config, cluster.as_deref(), cli.format).await
        }
        Command::Sync { config, cluster, dry_run } => {
            run_sync(&settings, &config, cluster.as_deref(), dry_run, cli.format).await
        }
        Command::Export { name, uri } => run_export(&settings, &name, uri).await,
    }
}

/// Initialize tracing with structured logging on stderr
fn init_tracing(log: &LogConfig) {
    let env_filter = EnvFilter::try_new(&log.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let compact = (log.format == LogFormat::Compact).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .compact()
    });
    let json = (log.format == LogFormat::Json)
        .then(|| fmt::layer().with_writer(std::io::stderr).json());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(compact)
        .with(json)
        .init();
}

fn load_clusters(path: &Path, only: Option<&str>) -> anyhow::Result<Vec<Cluster>> {
    let clusters = parse_config_file(path)
        .with_context(|| format!("Failed to load topology file {}", path.display()))?;
    info!("Loaded {} clusters from {}", clusters.len(), path.display());

    match only {
        None => Ok(clusters),
        Some(name) => {
            let selected: Vec<Cluster> = clusters.into_iter().filter(|c| c.name == name).collect();
            if selected.is_empty() {
                return Err(not_found_error(format!("cluster {} in {}", name, path.display())).into());
            }
            Ok(selected)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_diff(
    control: &Path,
    test: &Path,
    only: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let control = load_clusters(control, only)?;
    let test = load_clusters(test, only)?;

    let mut diffs = Vec::new();
    for c in &control {
        match test.iter().find(|t| t.name == c.name) {
            Some(t) => diffs.push(DiffEngine::diff(c, t)),
            None => warn!("Cluster {} has no counterpart in the TEST topology", c.name),
        }
    }
    for t in test.iter().filter(|t| !control.iter().any(|c| c.name == t.name)) {
        warn!("Cluster {} has no counterpart in the CONTROL topology", t.name);
    }

    match format {
        OutputFormat::Json => {
            let output: Vec<DiffOutput> = diffs
                .iter()
                .map(|diff| DiffOutput {
                    diff,
                    summary: DiffSummary::from_diff(diff),
                })
                .collect();
            print_json(&output)
        }
        OutputFormat::Text => {
            for diff in &diffs {
                print!("{}", render_text(diff));
            }
            Ok(())
        }
    }
}

async fn run_plan(
    settings: &Settings,
    path: &Path,
    only: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut outputs = Vec::new();

    for desired in load_clusters(path, only)? {
        let connection = ClusterConnection::from_cluster(&desired);
        info!("Planning against {}", connection.to_display_string());

        let admin = MongoAdmin::connect(&connection, &settings.mongo.app_name).await?;
        let observed = ClusterScanner::new(&admin)
            .skip_databases(settings.mongo.skip_databases.clone())
            .for_target(&desired)
            .scan(&desired.name, &connection)
            .await?;

        // CONTROL is what runs today, TEST is what the file asks for
        let diff = DiffEngine::diff(&observed, &desired);
        let report = Reconciler::new(&admin).dry_run(true).reconcile(&desired).await;
        outputs.push((diff, report));
    }

    match format {
        OutputFormat::Json => {
            let output: Vec<PlanOutput> = outputs
                .iter()
                .map(|(diff, report)| PlanOutput {
                    diff,
                    summary: DiffSummary::from_diff(diff),
                    report,
                })
                .collect();
            print_json(&output)
        }
        OutputFormat::Text => {
            for (diff, report) in &outputs {
                print!("{}", render_text(diff));
                print!("{}", render_report(report));
            }
            Ok(())
        }
    }
}

async fn run_sync(
    settings: &Settings,
    path: &Path,
    only: Option<&str>,
    dry_run: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut reports = Vec::new();

    for desired in load_clusters(path, only)? {
        let connection = ClusterConnection::from_cluster(&desired);
        info!("Syncing {}", connection.to_display_string());

        let admin = MongoAdmin::connect(&connection, &settings.mongo.app_name).await?;
        reports.push(Reconciler::new(&admin).dry_run(dry_run).reconcile(&desired).await);
    }

    match format {
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Text => {
            for report in &reports {
                print!("{}", render_report(report));
            }
        }
    }

    let failed: usize = reports.iter().map(|r| r.failures().len()).sum();
    if failed > 0 {
        bail!("{} entities failed to reconcile", failed);
    }
    Ok(())
}

async fn run_export(settings: &Settings, name: &str, uri: Option<String>) -> anyhow::Result<()> {
    let uri = uri
        .or_else(|| settings.mongo.uri.clone())
        .ok_or_else(|| anyhow!("No connection string: pass --uri or set MONGODB_URI"))?;

    let (admin, connection) = MongoAdmin::connect_uri(&uri, &settings.mongo.app_name).await?;
    let cluster = ClusterScanner::new(&admin)
        .skip_databases(settings.mongo.skip_databases.clone())
        .scan(name, &connection)
        .await?;

    print!("{}", render_config(&[cluster])?);
    Ok(())
}

fn render_report(report: &ReconcileReport) -> String {
    let mut out = format!(
        "reconcile {}{} (run {})\n",
        report.cluster,
        if report.dry_run { " [dry run]" } else { "" },
        report.run_id
    );

    for o in &report.outcomes {
        let line = match &o.outcome {
            Outcome::Created => format!("  created    {}: {}", o.database, o.entity),
            Outcome::Planned => format!("  would create {}: {}", o.database, o.entity),
            Outcome::Unchanged => format!("  unchanged  {}: {}", o.database, o.entity),
            Outcome::Drifted(detail) => format!("  drifted    {}: {} ({})", o.database, o.entity, detail),
            Outcome::Failed(detail) => format!("  FAILED     {}: {} ({})", o.database, o.entity, detail),
        };
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str(&format!(
        "  {} created, {} drifted, {} failed\n",
        report.created().len(),
        report.drifted().len(),
        report.failures().len()
    ));
    out
}
