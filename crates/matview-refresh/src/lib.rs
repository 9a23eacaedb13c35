//! Materialized view refresh: drop, rebuild, reindex.

pub mod batch;
pub mod orchestrator;

pub use batch::{BatchResult, StatementOutcome, execute_batch};
pub use orchestrator::{RefreshMode, RefreshOutcome, RefreshPlan, refresh};
