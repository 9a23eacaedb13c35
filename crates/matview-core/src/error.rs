use serde::Serialize;
use thiserror::Error;

/// SQLSTATE codes that mean the object a statement creates is already there.
const ALREADY_EXISTS_CODES: &[&str] = &[
    "42P07", // duplicate_table, also raised for indexes
    "42710", // duplicate_object
    "42P06", // duplicate_schema
    "42723", // duplicate_function
];

/// Error reported by the store for a single execute or query call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", self.describe())]
pub struct StoreError {
    /// Native error classification (SQLSTATE for Postgres), when the driver has one.
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// True when the store rejected the statement because its target already exists.
    pub fn is_already_exists(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| ALREADY_EXISTS_CODES.contains(&code))
    }

    fn describe(&self) -> String {
        match &self.code {
            Some(code) => format!("[{code}] {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// Core error type shared across matview crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The store rejected a call that cannot be contained at unit scope.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// A view name cannot be used to build a drop command.
    #[error("invalid view name: {0}")]
    InvalidViewName(String),
}

/// Convenience alias for results returned by matview crates.
pub type Result<T> = std::result::Result<T, Error>;
