use matview_core::{ExpectationSuite, Session};

use crate::evaluator::evaluate;
use crate::report::BenchmarkReport;

/// Evaluate every test of the suite in document order.
///
/// Failing tests never stop the run; every failure is collected in the report.
pub async fn run_suite<S>(session: &mut S, suite: &ExpectationSuite) -> BenchmarkReport
where
    S: Session + ?Sized,
{
    let mut report = BenchmarkReport::default();
    tracing::info!(
        event = "benchmarks_started",
        tables = suite.tables.len(),
        tests = suite.total_tests()
    );

    for table in &suite.tables {
        tracing::info!(
            event = "table_started",
            table = %table.table_name,
            tests = table.tests.len()
        );

        for test_case in &table.tests {
            tracing::info!(
                event = "test_started",
                table = %table.table_name,
                description = %test_case.description,
                query = %test_case.query
            );

            let mut result = evaluate(session, test_case).await;
            result.table = Some(table.table_name.clone());

            match result.failure_reason() {
                None => tracing::info!(
                    event = "test_passed",
                    description = %test_case.description,
                    column = test_case.column.as_deref().unwrap_or("-"),
                    actual = %show_value(&result.actual_value)
                ),
                Some(reason) => tracing::warn!(
                    event = "test_failed",
                    description = %test_case.description,
                    query = %test_case.query,
                    column = test_case.column.as_deref().unwrap_or("-"),
                    expected = %show_value(&result.expected_value),
                    actual = %show_value(&result.actual_value),
                    reason = %reason
                ),
            }

            report.record(result);
        }
    }

    tracing::info!(
        event = "benchmarks_finished",
        total = report.total,
        passed = report.passed,
        failed = report.failed,
        success_rate = %format!("{:.1}", report.success_rate())
    );
    report
}

fn show_value(value: &Option<matview_core::Scalar>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string())
}
