mod support;

use matview_core::{Expectation, MalformedExpectation, Scalar, StoreError, TestCase};
use matview_eval::{EvaluationError, evaluate};

use support::{FixtureSession, numbered_rows};

const COUNT_QUERY: &str = "SELECT count(*) FROM t";

#[tokio::test]
async fn row_count_matches() {
    let mut session = FixtureSession::new().returns(COUNT_QUERY, &["count"], numbered_rows(5));
    let test = TestCase::new(COUNT_QUERY, Expectation::RowCount(5));

    let result = evaluate(&mut session, &test).await;

    assert!(result.passed);
    assert_eq!(result.actual_value, Some(Scalar::Int(5)));
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn row_count_mismatch_reports_both_values() {
    let mut session = FixtureSession::new().returns(COUNT_QUERY, &["count"], numbered_rows(3));
    let test = TestCase::new(COUNT_QUERY, Expectation::RowCount(5));

    let result = evaluate(&mut session, &test).await;

    assert!(!result.passed);
    assert_eq!(result.actual_value, Some(Scalar::Int(3)));
    assert_eq!(result.expected_value, Some(Scalar::Int(5)));
    assert_eq!(result.failure_reason().as_deref(), Some("expected 5, got 3"));
}

#[tokio::test]
async fn row_count_ignores_column_content() {
    let sql = "SELECT region, total FROM sales";
    let rows = vec![
        vec![Scalar::from("north"), Scalar::Int(10)],
        vec![Scalar::from("south"), Scalar::Int(99)],
    ];
    let mut session = FixtureSession::new().returns(sql, &["region", "total"], rows);
    let test = TestCase::new(sql, Expectation::RowCount(2)).with_column("total");

    let result = evaluate(&mut session, &test).await;

    assert!(result.passed);
    assert_eq!(result.actual_value, Some(Scalar::Int(2)));
}

#[tokio::test]
async fn named_column_is_read_from_the_first_row() {
    let sql = "SELECT id, status FROM orders ORDER BY id";
    let rows = vec![
        vec![Scalar::Int(1), Scalar::from("closed")],
        vec![Scalar::Int(2), Scalar::from("open")],
    ];
    let mut session = FixtureSession::new().returns(sql, &["id", "status"], rows);
    let test = TestCase::new(sql, Expectation::ExactValue(Scalar::from("closed")))
        .with_column("status");

    let result = evaluate(&mut session, &test).await;

    assert!(result.passed);
    assert_eq!(result.actual_value, Some(Scalar::from("closed")));
}

#[tokio::test]
async fn missing_column_fails_without_panicking() {
    let sql = "SELECT id FROM orders";
    let mut session = FixtureSession::new().returns(sql, &["id"], vec![vec![Scalar::Int(1)]]);
    let test =
        TestCase::new(sql, Expectation::ExactValue(Scalar::from("open"))).with_column("status");

    let result = evaluate(&mut session, &test).await;

    assert!(!result.passed);
    assert_eq!(
        result.error,
        Some(EvaluationError::ColumnNotFound {
            column: "status".to_string(),
            available: vec!["id".to_string()],
        })
    );
}

#[tokio::test]
async fn named_column_without_rows_is_null() {
    let sql = "SELECT status FROM orders WHERE false";
    let mut session = FixtureSession::new().returns(sql, &["status"], Vec::new());
    let test = TestCase::new(sql, Expectation::ExactValue(Scalar::Null)).with_column("status");

    let result = evaluate(&mut session, &test).await;

    assert!(result.passed);
    assert_eq!(result.actual_value, Some(Scalar::Null));
}

#[tokio::test]
async fn first_value_of_first_row_is_compared_by_default() {
    let sql = "SELECT sum(total) FROM sales";
    let mut session =
        FixtureSession::new().returns(sql, &["sum"], vec![vec![Scalar::Float(109.0)]]);
    let test = TestCase::new(sql, Expectation::ExactValue(Scalar::Int(109)));

    let result = evaluate(&mut session, &test).await;

    assert!(result.passed);
}

#[tokio::test]
async fn empty_result_compares_as_null() {
    let sql = "SELECT max(day) FROM sales WHERE false";
    let mut session = FixtureSession::new().returns(sql, &["max"], Vec::new());
    let test = TestCase::new(sql, Expectation::ExactValue(Scalar::Int(1)));

    let result = evaluate(&mut session, &test).await;

    assert!(!result.passed);
    assert_eq!(result.actual_value, Some(Scalar::Null));
}

#[tokio::test]
async fn query_errors_are_contained() {
    let error = StoreError::with_code("42P01", "relation \"nope\" does not exist");
    let mut session = FixtureSession::new().fails("SELECT * FROM nope", error.clone());
    let test = TestCase::new("SELECT * FROM nope", Expectation::RowCount(0));

    let result = evaluate(&mut session, &test).await;

    assert!(!result.passed);
    assert_eq!(result.actual_value, None);
    assert_eq!(result.error, Some(EvaluationError::QueryFailed(error)));
}

#[tokio::test]
async fn malformed_expectation_fails_only_that_test() {
    let mut session = FixtureSession::new().returns(COUNT_QUERY, &["count"], numbered_rows(1));
    let mut test = TestCase::new(COUNT_QUERY, Expectation::RowCount(1));
    test.expected = Err(MalformedExpectation::new("`expected` sets neither `value` nor `count`"));

    let result = evaluate(&mut session, &test).await;

    assert!(!result.passed);
    assert!(matches!(
        result.error,
        Some(EvaluationError::MalformedExpectation(_))
    ));
    assert_eq!(session.queries, vec![COUNT_QUERY.to_string()]);
}

#[tokio::test]
async fn test_without_query_fails_without_touching_the_store() {
    let record: serde_yaml::Value =
        serde_yaml::from_str("description: orphan\nexpected: { count: 1 }").expect("yaml record");
    let test = TestCase::from_yaml(&record);
    let mut session = FixtureSession::new();

    let result = evaluate(&mut session, &test).await;

    assert!(!result.passed);
    assert_eq!(
        result.error,
        Some(EvaluationError::MalformedExpectation(MalformedExpectation::new(
            "test has no `query`"
        )))
    );
    assert_eq!(result.test_case.description, "orphan");
    assert!(session.queries.is_empty());
}
