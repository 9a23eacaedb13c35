mod support;

use matview_core::{Statement, StoreError, drop_view_statement};
use matview_refresh::{BatchResult, StatementOutcome, execute_batch};

use support::{Call, ScriptedSession};

fn statements(lines: &[&str]) -> Vec<Statement> {
    lines.iter().copied().map(Statement::from).collect()
}

#[tokio::test]
async fn clean_batch_commits_once() {
    let mut session = ScriptedSession::new();
    let batch = statements(&[
        "CREATE INDEX idx_a ON sales (a);",
        "CREATE INDEX idx_b ON sales (b);",
    ]);

    let result = execute_batch(&mut session, &batch).await;

    assert_eq!(result, BatchResult::AllSucceeded { statements: 2 });
    assert_eq!(
        session.calls,
        vec![Call::Committed(
            "CREATE INDEX idx_a ON sales (a);\nCREATE INDEX idx_b ON sales (b);".to_string()
        )]
    );
}

#[tokio::test]
async fn empty_batch_does_not_touch_the_store() {
    let mut session = ScriptedSession::new();
    let result = execute_batch(&mut session, &[]).await;
    assert_eq!(result, BatchResult::AllSucceeded { statements: 0 });
    assert!(session.calls.is_empty());
}

#[tokio::test]
async fn failed_combined_drop_is_retried_statement_by_statement() {
    let dependent = StoreError::with_code(
        "2BP01",
        "cannot drop materialized view sales_monthly because other objects depend on it",
    );
    let mut session = ScriptedSession::new().fail_on("IF EXISTS sales_monthly", dependent.clone());
    let batch = vec![
        drop_view_statement("sales_daily").unwrap(),
        drop_view_statement("sales_monthly").unwrap(),
    ];

    let result = execute_batch(&mut session, &batch).await;

    match &result {
        BatchResult::Recovered {
            combined_error,
            outcomes,
        } => {
            assert_eq!(combined_error, &dependent);
            assert_eq!(outcomes[0], StatementOutcome::Applied { index: 0 });
            assert_eq!(
                outcomes[1],
                StatementOutcome::StatementFailed {
                    index: 1,
                    excerpt: "DROP MATERIALIZED VIEW IF EXISTS sales_monthly;".to_string(),
                    error: dependent.clone(),
                }
            );
        }
        other => panic!("expected fallback, got {other:?}"),
    }
    assert_eq!(result.failed_count(), 1);

    assert_eq!(
        session.calls,
        vec![
            Call::RolledBack(Statement::combine(&batch)),
            Call::Committed("DROP MATERIALIZED VIEW IF EXISTS sales_daily;".to_string()),
            Call::RolledBack("DROP MATERIALIZED VIEW IF EXISTS sales_monthly;".to_string()),
        ]
    );
}

#[tokio::test]
async fn dropping_twice_never_fails() {
    let mut session = ScriptedSession::new();
    let batch = vec![
        drop_view_statement("sales_daily").unwrap(),
        drop_view_statement("sales_monthly").unwrap(),
    ];

    let first = execute_batch(&mut session, &batch).await;
    let second = execute_batch(&mut session, &batch).await;

    assert_eq!(first, BatchResult::AllSucceeded { statements: 2 });
    assert_eq!(second, BatchResult::AllSucceeded { statements: 2 });
}

#[tokio::test]
async fn rerunning_indexes_only_yields_idempotent_skips() {
    let mut session = ScriptedSession::new();
    let batch = statements(&[
        "CREATE INDEX idx_a ON sales (a);",
        "CREATE INDEX idx_b ON sales (b);",
        "CREATE INDEX idx_c ON sales (c);",
    ]);

    let first = execute_batch(&mut session, &batch).await;
    assert!(matches!(first, BatchResult::AllSucceeded { statements: 3 }));

    let second = execute_batch(&mut session, &batch).await;
    assert!(second.is_clean());
    assert_eq!(second.skipped_count(), 3);
    assert!(
        second
            .outcomes()
            .iter()
            .all(|outcome| matches!(outcome, StatementOutcome::IdempotentSkip { .. }))
    );
}

#[tokio::test]
async fn one_bad_index_does_not_block_the_others() {
    let syntax = StoreError::with_code("42601", "syntax error at or near \"INDX\"");
    let mut session = ScriptedSession::new().fail_on("INDX", syntax);
    let batch = statements(&[
        "CREATE INDEX idx_a ON sales (a);",
        "CREATE INDX idx_b ON sales (b);",
        "CREATE INDEX idx_c ON sales (c);",
    ]);

    let result = execute_batch(&mut session, &batch).await;

    assert_eq!(result.failed_count(), 1);
    assert!(matches!(
        result.outcomes(),
        [
            StatementOutcome::Applied { index: 0 },
            StatementOutcome::StatementFailed { index: 1, .. },
            StatementOutcome::Applied { index: 2 },
        ]
    ));
    assert!(session.objects.contains("idx_a"));
    assert!(session.objects.contains("idx_c"));
    assert_eq!(
        session.committed(),
        vec![
            "CREATE INDEX idx_a ON sales (a);",
            "CREATE INDEX idx_c ON sales (c);"
        ]
    );
}
