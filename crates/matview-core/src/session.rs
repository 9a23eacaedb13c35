use async_trait::async_trait;

use crate::error::StoreError;
use crate::scalar::Scalar;

/// Rows and column descriptors returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Scalar>>,
}

impl QueryOutput {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Value at `index` in the first row, `None` when there are no rows.
    pub fn first_row_value(&self, index: usize) -> Option<&Scalar> {
        self.rows.first().and_then(|row| row.get(index))
    }
}

/// An open SQL-executing session owned by one run.
///
/// Implementations hold exactly one connection. Every call completes,
/// including commit or rollback, before it returns.
#[async_trait]
pub trait Session: Send {
    /// Execute `sql` (one or more statements) in a single transaction.
    ///
    /// Commits on success. On failure the transaction is rolled back before
    /// the error is returned, so no transaction is left open.
    async fn execute_transaction(&mut self, sql: &str) -> Result<(), StoreError>;

    /// Run a read-only query and fetch every row along with the column names.
    async fn query(&mut self, sql: &str) -> Result<QueryOutput, StoreError>;
}
