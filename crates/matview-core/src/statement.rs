use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of index statements read from an index source.
pub const DEFAULT_INDEX_CAP: usize = 41;

const EXCERPT_CHARS: usize = 60;

/// A single SQL command. Its only identity is its position in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statement(String);

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn sql(&self) -> &str {
        &self.0
    }

    /// Leading characters of the statement, suitable for log lines.
    pub fn excerpt(&self) -> String {
        let mut chars = self.0.chars();
        let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }

    /// Join statements into one script, one statement per line.
    pub fn combine(statements: &[Statement]) -> String {
        statements
            .iter()
            .map(Statement::sql)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Statement {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Statement {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Definition of one view: where it came from and the full SQL that builds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub source: String,
    pub sql: String,
}

impl BuildStep {
    pub fn new(source: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            sql: sql.into(),
        }
    }
}

/// Check that a view name is a plain or schema-qualified identifier.
pub fn validate_view_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidViewName(name.to_string()))
    }
}

/// Build the drop command for a materialized view.
pub fn drop_view_statement(name: &str) -> Result<Statement> {
    validate_view_name(name)?;
    Ok(Statement::new(format!(
        "DROP MATERIALIZED VIEW IF EXISTS {name};"
    )))
}

/// Read index creation statements from an index source, one per line.
///
/// Blank lines and lines starting with `--` or `/*` are skipped. At most
/// `cap` statements are returned; anything past the cap is never read.
pub fn read_index_source(source: &str, cap: usize) -> Vec<Statement> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--") && !line.starts_with("/*"))
        .take(cap)
        .map(Statement::from)
        .collect()
}
