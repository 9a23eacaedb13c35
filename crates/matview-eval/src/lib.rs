//! Expectation evaluation and benchmark reporting.

pub mod evaluator;
pub mod report;
pub mod runner;

pub use evaluator::{EvaluationError, EvaluationResult, evaluate};
pub use report::{BenchmarkReport, REMEDIATION_HINTS, render_report};
pub use runner::run_suite;
