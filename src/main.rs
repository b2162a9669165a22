//! CLI entry point for the screw-tightening report tool.
//!
//! Provides subcommands for validating a batch of robot logs, printing its
//! failure-rate summary, and exporting the weekly xlsx report.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use screw_report::{
    config::ReportConfig,
    discover::resolve_inputs,
    output::{write_json, write_summary},
    period::ValidatedBatch,
    session::Session,
};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "screw-report")]
#[command(about = "Weekly failure-rate reports from screw-tightening robot logs")]
#[command(long_about = None)]
struct Cli {
    /// TOML config file; defaults apply when omitted
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest and validate the inputs, then print what the batch covers
    Check {
        /// CSV files or directories searched recursively for CSV files
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Print weekly per-robot failure rates and the daily pivot
    Summary {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Print every aggregate as JSON instead
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write the xlsx report
    Export {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Directory the report file is written to
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/screw_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("screw_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!(error = %e, "Run failed");
        return Err(e);
    }
    Ok(())
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

fn run(cli: Cli) -> Result<()> {
    let config = ReportConfig::load_or_default(cli.config.as_deref())?;
    let mut session = Session::new(config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Check { inputs } => {
            let batch = build(&mut session, &inputs)?;
            let robots: BTreeSet<&str> =
                batch.events().iter().map(|e| e.robot_id.as_str()).collect();

            writeln!(out, "variant: {}", batch.variant())?;
            writeln!(out, "week:    {}", batch.period().week)?;
            writeln!(out, "year:    {}", batch.period().year)?;
            writeln!(
                out,
                "robots:  {}",
                robots.into_iter().collect::<Vec<_>>().join(", ")
            )?;
            writeln!(out, "events:  {}", batch.events().len())?;
        }
        Commands::Summary { inputs, json } => {
            build(&mut session, &inputs)?;
            let aggregates = session.aggregates()?;
            if json {
                write_json(&mut out, &aggregates)?;
            } else {
                write_summary(&mut out, &aggregates)?;
            }
        }
        Commands::Export { inputs, out: dest } => {
            build(&mut session, &inputs)?;
            session.set_destination(dest);
            let outcome = session.export()?;

            for warning in &outcome.warnings {
                warn!(warning = %warning, "Export finished with a formatting issue");
                writeln!(out, "warning: {warning}")?;
            }
            writeln!(out, "{}", outcome.path.display())?;
        }
    }

    Ok(())
}

/// Resolves the inputs, selects them and builds the batch.
fn build<'s>(session: &'s mut Session, inputs: &[PathBuf]) -> Result<&'s ValidatedBatch> {
    let files = resolve_inputs(inputs)?;
    info!(files = files.len(), "Inputs resolved");
    session.select_files(files)?;
    Ok(session.build()?)
}
