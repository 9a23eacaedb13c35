use serde::Serialize;
use tracing::Instrument;

use matview_core::{
    BuildStep, DEFAULT_INDEX_CAP, Session, Statement, StoreError, read_index_source,
};

use crate::batch::{BatchResult, execute_batch};

/// Everything a refresh needs, already loaded by the caller.
#[derive(Debug, Clone)]
pub struct RefreshPlan {
    /// Drop commands in execution order; dependents must come first.
    pub drops: Vec<Statement>,
    /// View definitions in build order; dependencies must come first.
    pub builds: Vec<BuildStep>,
    /// Index source text, one statement per line.
    pub index_source: String,
    /// Maximum number of index statements read from `index_source`.
    pub index_cap: usize,
}

impl RefreshPlan {
    pub fn new(
        drops: Vec<Statement>,
        builds: Vec<BuildStep>,
        index_source: impl Into<String>,
    ) -> Self {
        Self {
            drops,
            builds,
            index_source: index_source.into(),
            index_cap: DEFAULT_INDEX_CAP,
        }
    }

    pub fn with_index_cap(mut self, index_cap: usize) -> Self {
        self.index_cap = index_cap;
        self
    }

    pub fn index_statements(&self) -> Vec<Statement> {
        read_index_source(&self.index_source, self.index_cap)
    }
}

/// Whether the caller wants the refresh to run at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    #[default]
    Full,
    ValidateOnly,
}

/// Terminal state of a refresh run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Completed {
        drops: BatchResult,
        built: usize,
        indexes: BatchResult,
    },
    /// A build step failed; later builds and the index phase did not run.
    AbortedAtBuild {
        step: usize,
        source: String,
        drops: BatchResult,
        error: StoreError,
    },
    SkippedByCaller,
}

impl RefreshOutcome {
    /// True when the refresh left views missing and dependent phases must not run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RefreshOutcome::AbortedAtBuild { .. })
    }
}

/// Drop every view, rebuild each from its definition, then recreate indexes.
///
/// Drop and index phases go through the batcher and tolerate per-statement
/// failures. A build failure is fatal because later views may read from
/// earlier ones.
pub async fn refresh<S>(session: &mut S, plan: &RefreshPlan, mode: RefreshMode) -> RefreshOutcome
where
    S: Session + ?Sized,
{
    if mode == RefreshMode::ValidateOnly {
        tracing::info!(event = "refresh_skipped", "validate-only mode, views are left as they are");
        return RefreshOutcome::SkippedByCaller;
    }

    tracing::info!(event = "drop_phase_started", statements = plan.drops.len());
    let drops = execute_batch(session, &plan.drops)
        .instrument(tracing::info_span!("drop_phase"))
        .await;
    tracing::info!(event = "drop_phase_finished", failed = drops.failed_count());

    let mut built = 0;
    for (step, build) in plan.builds.iter().enumerate() {
        tracing::info!(
            event = "build_step_started",
            step = step + 1,
            source = %build.source,
            bytes = build.sql.len()
        );

        if let Err(error) = session.execute_transaction(&build.sql).await {
            tracing::error!(
                event = "build_step_failed",
                step = step + 1,
                source = %build.source,
                code = error.code.as_deref().unwrap_or("-"),
                error = %error.message,
                "aborting remaining build steps and the index phase"
            );
            return RefreshOutcome::AbortedAtBuild {
                step,
                source: build.source.clone(),
                drops,
                error,
            };
        }

        tracing::info!(event = "build_step_committed", step = step + 1, source = %build.source);
        built += 1;
    }

    let index_statements = plan.index_statements();
    tracing::info!(
        event = "index_phase_started",
        statements = index_statements.len(),
        cap = plan.index_cap
    );
    let indexes = execute_batch(session, &index_statements)
        .instrument(tracing::info_span!("index_phase"))
        .await;
    tracing::info!(
        event = "index_phase_finished",
        failed = indexes.failed_count(),
        skipped = indexes.skipped_count()
    );

    RefreshOutcome::Completed {
        drops,
        built,
        indexes,
    }
}
