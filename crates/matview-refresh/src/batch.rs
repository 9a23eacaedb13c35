use serde::Serialize;

use matview_core::{Session, Statement, StoreError};

/// How one statement fared during the statement-by-statement pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatementOutcome {
    Applied {
        index: usize,
    },
    /// The target already exists; not counted as an error.
    IdempotentSkip {
        index: usize,
        excerpt: String,
    },
    StatementFailed {
        index: usize,
        excerpt: String,
        error: StoreError,
    },
}

/// Result of executing a batch of statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchResult {
    /// The combined transaction committed.
    AllSucceeded { statements: usize },
    /// The combined transaction was rolled back and each statement was
    /// retried in its own transaction.
    Recovered {
        combined_error: StoreError,
        outcomes: Vec<StatementOutcome>,
    },
}

impl BatchResult {
    pub fn outcomes(&self) -> &[StatementOutcome] {
        match self {
            BatchResult::AllSucceeded { .. } => &[],
            BatchResult::Recovered { outcomes, .. } => outcomes,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|outcome| matches!(outcome, StatementOutcome::StatementFailed { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|outcome| matches!(outcome, StatementOutcome::IdempotentSkip { .. }))
            .count()
    }

    /// True when every statement either applied or was already in place.
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Execute `statements` as one transaction, falling back to one transaction
/// per statement when the combined attempt fails.
///
/// The fallback pass never stops early: a failing statement is rolled back
/// and recorded, and the next statement is attempted.
pub async fn execute_batch<S>(session: &mut S, statements: &[Statement]) -> BatchResult
where
    S: Session + ?Sized,
{
    if statements.is_empty() {
        tracing::info!(event = "batch_empty");
        return BatchResult::AllSucceeded { statements: 0 };
    }

    tracing::info!(event = "batch_started", statements = statements.len());

    let combined = Statement::combine(statements);
    let combined_error = match session.execute_transaction(&combined).await {
        Ok(()) => {
            tracing::info!(event = "batch_committed", statements = statements.len());
            return BatchResult::AllSucceeded {
                statements: statements.len(),
            };
        }
        Err(err) => err,
    };

    tracing::warn!(
        event = "batch_rolled_back",
        code = combined_error.code.as_deref().unwrap_or("-"),
        error = %combined_error.message,
        "combined batch failed, retrying statements one at a time"
    );

    let mut outcomes = Vec::with_capacity(statements.len());
    for (index, statement) in statements.iter().enumerate() {
        let outcome = match session.execute_transaction(statement.sql()).await {
            Ok(()) => {
                tracing::info!(event = "statement_applied", statement = index + 1);
                StatementOutcome::Applied { index }
            }
            Err(err) if err.is_already_exists() => {
                tracing::info!(
                    event = "statement_skipped",
                    statement = index + 1,
                    excerpt = %statement.excerpt(),
                    "target already exists"
                );
                StatementOutcome::IdempotentSkip {
                    index,
                    excerpt: statement.excerpt(),
                }
            }
            Err(err) => {
                tracing::error!(
                    event = "statement_failed",
                    statement = index + 1,
                    excerpt = %statement.excerpt(),
                    code = err.code.as_deref().unwrap_or("-"),
                    error = %err.message
                );
                StatementOutcome::StatementFailed {
                    index,
                    excerpt: statement.excerpt(),
                    error: err,
                }
            }
        };
        outcomes.push(outcome);
    }

    let result = BatchResult::Recovered {
        combined_error,
        outcomes,
    };
    tracing::info!(
        event = "batch_recovered",
        failed = result.failed_count(),
        skipped = result.skipped_count()
    );
    result
}
