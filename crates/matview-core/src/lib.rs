//! Core contracts shared by the matview crates.
//!
//! Defines the statement and expectation models, the `Session` seam the
//! refresh and evaluation engines run against, and helpers that do not need
//! a database driver.

pub mod error;
pub mod expectation;
pub mod redaction;
pub mod scalar;
pub mod session;
pub mod statement;

pub use error::{Error, Result, StoreError};
pub use expectation::{
    DEFAULT_DESCRIPTION, Expectation, ExpectationSuite, MalformedExpectation, SuiteError, TableSpec,
    TestCase,
};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use scalar::Scalar;
pub use session::{QueryOutput, Session};
pub use statement::{
    BuildStep, DEFAULT_INDEX_CAP, Statement, drop_view_statement, read_index_source,
    validate_view_name,
};
