//! Declarative expectation suites.
//!
//! A suite is a YAML sequence of tables, each carrying the tests that assert
//! on the table's contents. Malformed expectations are kept on the test case
//! so they fail that test alone instead of rejecting the whole document.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::scalar::Scalar;
use crate::statement::Statement;

/// Description used when a test case does not provide one.
pub const DEFAULT_DESCRIPTION: &str = "No description";

/// What a test compares the query result against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// The selected value must equal this scalar.
    ExactValue(Scalar),
    /// The query must return this many rows.
    RowCount(u64),
}

impl Expectation {
    /// The value the actual result is compared with.
    pub fn expected_value(&self) -> Scalar {
        match self {
            Expectation::ExactValue(value) => value.clone(),
            Expectation::RowCount(count) => Scalar::Int(*count as i64),
        }
    }

    /// Parse the `expected` mapping of a test case.
    pub fn from_yaml(value: Option<&serde_yaml::Value>) -> Result<Self, MalformedExpectation> {
        let Some(mapping) = value.and_then(serde_yaml::Value::as_mapping) else {
            return Err(MalformedExpectation::new(
                "`expected` must be a mapping with `value` or `count`",
            ));
        };

        match (mapping.get("value"), mapping.get("count")) {
            (Some(_), Some(_)) => Err(MalformedExpectation::new(
                "`expected` sets both `value` and `count`",
            )),
            (None, None) => Err(MalformedExpectation::new(
                "`expected` sets neither `value` nor `count`",
            )),
            (Some(value), None) => Scalar::from_yaml(value)
                .map(Expectation::ExactValue)
                .ok_or_else(|| MalformedExpectation::new("`value` must be a scalar")),
            (None, Some(count)) => count
                .as_u64()
                .filter(|count| i64::try_from(*count).is_ok())
                .map(Expectation::RowCount)
                .ok_or_else(|| {
                    MalformedExpectation::new("`count` must be a non-negative integer")
                }),
        }
    }
}

/// The `expected` block of a test case resolves to no comparison mode.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("malformed expectation: {reason}")]
pub struct MalformedExpectation {
    pub reason: String,
}

impl MalformedExpectation {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// One declarative check against live data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_yaml::Value")]
pub struct TestCase {
    pub query: Statement,
    #[serde(serialize_with = "serialize_expected")]
    pub expected: Result<Expectation, MalformedExpectation>,
    pub column: Option<String>,
    pub description: String,
}

impl TestCase {
    pub fn new(query: impl Into<String>, expected: Expectation) -> Self {
        Self {
            query: Statement::new(query),
            expected: Ok(expected),
            column: None,
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Build a test from one record of the document.
    ///
    /// Record-level problems (no query, a non-string column, a record that is
    /// not a mapping) are stored as a malformed expectation on the test so
    /// only this test fails. A test without a query keeps an empty statement.
    pub fn from_yaml(record: &serde_yaml::Value) -> Self {
        let Some(mapping) = record.as_mapping() else {
            return Self::malformed("test record must be a mapping");
        };

        let mut test_case = Self::malformed("test has no `query`");
        match mapping.get("description").map(scalar_text) {
            None | Some(Ok(None)) => {}
            Some(Ok(Some(description))) => test_case.description = description,
            Some(Err(())) => return test_case.reject("`description` must be a scalar"),
        }

        match mapping.get("query") {
            Some(serde_yaml::Value::String(sql)) if !sql.trim().is_empty() => {
                test_case.query = Statement::new(sql.as_str());
            }
            Some(_) => return test_case.reject("`query` must be a non-empty string"),
            None => return test_case,
        }

        match mapping.get("column").map(scalar_text) {
            None | Some(Ok(None)) => {}
            Some(Ok(Some(column))) => test_case.column = Some(column),
            Some(Err(())) => return test_case.reject("`column` must be a string"),
        }

        test_case.expected = Expectation::from_yaml(mapping.get("expected"));
        test_case
    }

    fn malformed(reason: &str) -> Self {
        Self {
            query: Statement::new(""),
            expected: Err(MalformedExpectation::new(reason)),
            column: None,
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    fn reject(mut self, reason: &str) -> Self {
        self.expected = Err(MalformedExpectation::new(reason));
        self
    }

    /// False when the record carried no usable query.
    pub fn has_query(&self) -> bool {
        !self.query.sql().trim().is_empty()
    }
}

impl From<serde_yaml::Value> for TestCase {
    fn from(record: serde_yaml::Value) -> Self {
        TestCase::from_yaml(&record)
    }
}

/// Text of a YAML scalar; `Ok(None)` for null, `Err` for collections.
fn scalar_text(value: &serde_yaml::Value) -> Result<Option<String>, ()> {
    use serde_yaml::Value;

    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text.clone())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => Err(()),
    }
}

fn serialize_expected<S: Serializer>(
    expected: &Result<Expectation, MalformedExpectation>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    expected.as_ref().ok().serialize(serializer)
}

/// Name used for a table entry that does not carry one.
pub const UNNAMED_TABLE: &str = "<unnamed table>";

/// Tests grouped under the table they check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_yaml::Value")]
pub struct TableSpec {
    #[serde(rename = "table")]
    pub table_name: String,
    pub tests: Vec<TestCase>,
}

impl TableSpec {
    pub fn new(table_name: impl Into<String>, tests: Vec<TestCase>) -> Self {
        Self {
            table_name: table_name.into(),
            tests,
        }
    }

    /// Build a table entry. A missing name falls back to [`UNNAMED_TABLE`];
    /// a `tests` value that is not a list becomes one malformed test.
    pub fn from_yaml(entry: &serde_yaml::Value) -> Self {
        let Some(mapping) = entry.as_mapping() else {
            return Self::new(
                UNNAMED_TABLE,
                vec![TestCase::malformed("table entry must be a mapping")],
            );
        };

        let table_name = match mapping.get("table").map(scalar_text) {
            Some(Ok(Some(name))) => name,
            _ => UNNAMED_TABLE.to_string(),
        };
        let tests = match mapping.get("tests") {
            None | Some(serde_yaml::Value::Null) => Vec::new(),
            Some(serde_yaml::Value::Sequence(records)) => {
                records.iter().map(TestCase::from_yaml).collect()
            }
            Some(_) => vec![TestCase::malformed("`tests` must be a list")],
        };

        Self { table_name, tests }
    }
}

impl From<serde_yaml::Value> for TableSpec {
    fn from(entry: serde_yaml::Value) -> Self {
        TableSpec::from_yaml(&entry)
    }
}

/// Ordered sequence of table specs, evaluated in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpectationSuite {
    pub tables: Vec<TableSpec>,
}

/// The expectation document cannot be turned into a suite.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("expectation document is empty")]
    Empty,
    #[error("invalid expectation document: {0}")]
    Invalid(#[from] serde_yaml::Error),
}

impl ExpectationSuite {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        Self { tables }
    }

    /// Parse a YAML expectation document.
    pub fn from_yaml_str(document: &str) -> Result<Self, SuiteError> {
        if document.trim().is_empty() {
            return Err(SuiteError::Empty);
        }

        let value: serde_yaml::Value = serde_yaml::from_str(document)?;
        if value.is_null() {
            return Err(SuiteError::Empty);
        }

        let tables: Vec<TableSpec> = serde_yaml::from_value(value)?;
        if tables.is_empty() {
            return Err(SuiteError::Empty);
        }

        Ok(Self { tables })
    }

    pub fn total_tests(&self) -> usize {
        self.tables.iter().map(|table| table.tests.len()).sum()
    }
}
