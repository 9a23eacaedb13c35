mod config;
mod job;
mod logging;

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use matview_core::StoreError;
use matview_postgres::PgSession;
use matview_refresh::RefreshOutcome;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use config::{ConfigError, ConnectionSettings, load_job_config};
use job::{BenchmarksOutcome, Job, JobOutcome, run_job};

#[derive(Debug, Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("connection failed: {0}")]
    Connection(StoreError),
    #[error("refresh aborted at build step {step} ({definition}): {error}")]
    RefreshAborted {
        step: usize,
        definition: String,
        error: StoreError,
    },
    #[error("benchmarks unavailable: {0}")]
    SuiteUnavailable(String),
    #[error("{failed} of {total} benchmark tests failed")]
    BenchmarksFailed { failed: usize, total: usize },
}

#[derive(Parser, Debug)]
#[command(
    name = "matview",
    version,
    about = "Refresh materialized views and validate them against benchmarks"
)]
struct Cli {
    /// Job file listing views, indexes and benchmarks.
    #[arg(long, default_value = "matview.toml")]
    config: PathBuf,
    /// Database connection string; DB_* variables are used when absent.
    #[arg(long, env = "DATABASE_URL", value_name = "CONNECTION_STRING")]
    conn: Option<String>,
    /// Skip the refresh and only run the benchmarks.
    #[arg(long, default_value_t = false)]
    only_benchmarks: bool,
    /// Fail when any benchmark test fails or the document has no tests.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Append NDJSON logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_file.as_deref()).map_err(CliError::Logging)?;

    let run_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("run", run_id = %run_id);
    let result = run(cli).instrument(span).await;
    if let Err(err) = &result {
        tracing::error!(event = "run_failed", run_id = %run_id, error = %err);
    }
    result
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let timer = Instant::now();
    tracing::info!(
        event = "run_started",
        config = %cli.config.display(),
        only_benchmarks = cli.only_benchmarks,
        strict = cli.strict
    );

    let config = load_job_config(&cli.config)?;
    let plan = if cli.only_benchmarks {
        None
    } else {
        Some(config.load_refresh_plan()?)
    };
    let job = Job {
        plan,
        benchmark_source: config.benchmarks.source.clone(),
    };

    let settings = ConnectionSettings::resolve(cli.conn.as_deref(), |key| std::env::var(key).ok())?;
    tracing::info!(event = "connecting", connection = %settings.redacted);
    let mut session = PgSession::connect(&settings.options)
        .await
        .map_err(CliError::Connection)?;
    tracing::info!(event = "connected", connection = %settings.redacted);

    let outcome = run_job(&mut session, &job).await;

    if let Err(err) = session.close().await {
        tracing::warn!(event = "close_failed", error = %err);
    }

    let result = exit_result(outcome, cli.strict);
    tracing::info!(
        event = "run_finished",
        status = if result.is_ok() { "success" } else { "failure" },
        duration_ms = timer.elapsed().as_millis()
    );
    result
}

fn exit_result(outcome: JobOutcome, strict: bool) -> Result<(), CliError> {
    if let RefreshOutcome::AbortedAtBuild {
        step, source, error, ..
    } = outcome.refresh
    {
        return Err(CliError::RefreshAborted {
            step: step + 1,
            definition: source,
            error,
        });
    }

    match outcome.benchmarks {
        BenchmarksOutcome::Unavailable(reason) if strict => Err(CliError::SuiteUnavailable(reason)),
        BenchmarksOutcome::Ran(report) if strict && report.has_failures() => {
            Err(CliError::BenchmarksFailed {
                failed: report.failed,
                total: report.total,
            })
        }
        _ => Ok(()),
    }
}
