use std::path::PathBuf;

use tracing::Instrument;

use matview_core::{ExpectationSuite, Session, SuiteError};
use matview_eval::{BenchmarkReport, render_report, run_suite};
use matview_refresh::{RefreshMode, RefreshOutcome, RefreshPlan, refresh};

use crate::config::read_file;

/// Everything one run needs once configuration has been loaded.
#[derive(Debug)]
pub struct Job {
    /// `None` when only benchmarks should run.
    pub plan: Option<RefreshPlan>,
    pub benchmark_source: PathBuf,
}

#[derive(Debug)]
pub enum BenchmarksOutcome {
    /// The refresh aborted, so views may be missing.
    NotRun,
    /// The expectation document could not be read or held no tests.
    Unavailable(String),
    Ran(BenchmarkReport),
}

#[derive(Debug)]
pub struct JobOutcome {
    pub refresh: RefreshOutcome,
    pub benchmarks: BenchmarksOutcome,
}

/// Refresh the views, then validate them against the expectation document.
pub async fn run_job<S>(session: &mut S, job: &Job) -> JobOutcome
where
    S: Session + ?Sized,
{
    let refresh_outcome = match &job.plan {
        Some(plan) => {
            refresh(session, plan, RefreshMode::Full)
                .instrument(tracing::info_span!("refresh"))
                .await
        }
        None => RefreshOutcome::SkippedByCaller,
    };

    if refresh_outcome.is_fatal() {
        tracing::error!(
            event = "benchmarks_skipped",
            "refresh aborted, benchmarks were not run"
        );
        return JobOutcome {
            refresh: refresh_outcome,
            benchmarks: BenchmarksOutcome::NotRun,
        };
    }

    let suite = match load_suite(job) {
        Ok(suite) => suite,
        Err(reason) => {
            tracing::warn!(
                event = "benchmarks_unavailable",
                path = %job.benchmark_source.display(),
                reason = %reason
            );
            return JobOutcome {
                refresh: refresh_outcome,
                benchmarks: BenchmarksOutcome::Unavailable(reason),
            };
        }
    };

    let report = run_suite(session, &suite)
        .instrument(tracing::info_span!("benchmarks"))
        .await;
    for line in render_report(&report).lines().filter(|line| !line.is_empty()) {
        tracing::info!(event = "report", "{line}");
    }

    JobOutcome {
        refresh: refresh_outcome,
        benchmarks: BenchmarksOutcome::Ran(report),
    }
}

fn load_suite(job: &Job) -> Result<ExpectationSuite, String> {
    let document = read_file(&job.benchmark_source).map_err(|err| err.to_string())?;
    ExpectationSuite::from_yaml_str(&document).map_err(|err| match err {
        SuiteError::Empty => "no tests defined".to_string(),
        other => other.to_string(),
    })
}
