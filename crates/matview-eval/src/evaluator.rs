use serde::Serialize;
use thiserror::Error;

use matview_core::{Expectation, MalformedExpectation, Scalar, Session, StoreError, TestCase};

/// Why a test case could not be compared.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationError {
    #[error("query failed: {0}")]
    QueryFailed(StoreError),
    #[error("column `{column}` not found in result (columns: {})", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },
    #[error("{0}")]
    MalformedExpectation(MalformedExpectation),
}

/// Outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    /// Table the test belongs to, set by the suite runner.
    pub table: Option<String>,
    pub test_case: TestCase,
    pub actual_value: Option<Scalar>,
    pub expected_value: Option<Scalar>,
    pub passed: bool,
    pub error: Option<EvaluationError>,
}

impl EvaluationResult {
    fn failed(test_case: &TestCase, actual_value: Option<Scalar>, error: EvaluationError) -> Self {
        Self {
            table: None,
            test_case: test_case.clone(),
            actual_value,
            expected_value: None,
            passed: false,
            error: Some(error),
        }
    }

    /// Human-readable reason for a failure, `None` when the test passed.
    pub fn failure_reason(&self) -> Option<String> {
        if self.passed {
            return None;
        }
        if let Some(error) = &self.error {
            return Some(error.to_string());
        }
        let show = |value: &Option<Scalar>| {
            value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string())
        };
        Some(format!(
            "expected {}, got {}",
            show(&self.expected_value),
            show(&self.actual_value)
        ))
    }
}

/// Run one test case's query and compare the result with its expectation.
///
/// Errors never escape: a failing query, a missing column or a malformed
/// expectation become a failed result for this test only.
pub async fn evaluate<S>(session: &mut S, test_case: &TestCase) -> EvaluationResult
where
    S: Session + ?Sized,
{
    if !test_case.has_query() {
        let malformed = test_case
            .expected
            .clone()
            .err()
            .unwrap_or_else(|| MalformedExpectation::new("test has no `query`"));
        return EvaluationResult::failed(
            test_case,
            None,
            EvaluationError::MalformedExpectation(malformed),
        );
    }

    let output = match session.query(test_case.query.sql()).await {
        Ok(output) => output,
        Err(err) => {
            return EvaluationResult::failed(test_case, None, EvaluationError::QueryFailed(err));
        }
    };

    let column_index = match &test_case.column {
        Some(column) => match output.column_index(column) {
            Some(index) => Some(index),
            None => {
                return EvaluationResult::failed(
                    test_case,
                    None,
                    EvaluationError::ColumnNotFound {
                        column: column.clone(),
                        available: output.columns.clone(),
                    },
                );
            }
        },
        None => None,
    };

    // Row counts ignore the selected column; the column still has to exist.
    let actual = match (&test_case.expected, column_index) {
        (Ok(Expectation::RowCount(_)), _) => Scalar::Int(output.rows.len() as i64),
        (_, index) => output
            .first_row_value(index.unwrap_or(0))
            .cloned()
            .unwrap_or(Scalar::Null),
    };

    let expected = match &test_case.expected {
        Ok(expectation) => expectation.expected_value(),
        Err(malformed) => {
            return EvaluationResult::failed(
                test_case,
                Some(actual),
                EvaluationError::MalformedExpectation(malformed.clone()),
            );
        }
    };

    EvaluationResult {
        table: None,
        test_case: test_case.clone(),
        passed: actual == expected,
        actual_value: Some(actual),
        expected_value: Some(expected),
        error: None,
    }
}
