use serde::Serialize;

use crate::evaluator::EvaluationResult;

/// Hints printed when at least one test failed.
pub const REMEDIATION_HINTS: &[&str] = &[
    "check the format of the expected values in the expectation document",
    "make sure the materialized views contain the expected data",
    "check the SQL queries used by the failing tests",
];

/// Aggregate outcome of a benchmark run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<EvaluationResult>,
}

impl BenchmarkReport {
    pub fn record(&mut self, result: EvaluationResult) {
        self.total += 1;
        if result.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// Percentage of passed tests, `0.0` for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passed as f64 / self.total as f64 * 100.0
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &EvaluationResult> {
        self.results.iter().filter(|result| !result.passed)
    }

    pub fn remediation_hints(&self) -> &'static [&'static str] {
        if self.has_failures() {
            REMEDIATION_HINTS
        } else {
            &[]
        }
    }
}

/// Render the run summary, failing tests and hints as markdown.
pub fn render_report(report: &BenchmarkReport) -> String {
    let mut lines = Vec::new();

    lines.push("# Benchmark summary".to_string());
    lines.push(String::new());
    lines.push(format!("- total: {}", report.total));
    lines.push(format!("- passed: {}", report.passed));
    lines.push(format!("- failed: {}", report.failed));
    lines.push(format!("- success rate: {:.1}%", report.success_rate()));

    if report.has_failures() {
        lines.push(String::new());
        lines.push("## Failed tests".to_string());
        for result in report.failures() {
            let table = result.table.as_deref().unwrap_or("-");
            let reason = result.failure_reason().unwrap_or_default();
            lines.push(format!(
                "- {table}: {}: {reason}",
                result.test_case.description
            ));
        }

        lines.push(String::new());
        lines.push("## Recommendations".to_string());
        for (idx, hint) in report.remediation_hints().iter().enumerate() {
            lines.push(format!("{}. {hint}", idx + 1));
        }
    }

    lines.join("\n")
}
