#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use matview_core::{QueryOutput, Scalar, Session, StoreError};

/// Session answering queries from fixed result sets.
#[derive(Debug, Default)]
pub struct FixtureSession {
    responses: HashMap<String, Result<QueryOutput, StoreError>>,
    pub queries: Vec<String>,
}

impl FixtureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returns(mut self, sql: &str, columns: &[&str], rows: Vec<Vec<Scalar>>) -> Self {
        let columns = columns.iter().map(|column| column.to_string()).collect();
        self.responses
            .insert(sql.to_string(), Ok(QueryOutput::new(columns, rows)));
        self
    }

    pub fn fails(mut self, sql: &str, error: StoreError) -> Self {
        self.responses.insert(sql.to_string(), Err(error));
        self
    }
}

/// `count` single-column rows holding 1..=count.
pub fn numbered_rows(count: i64) -> Vec<Vec<Scalar>> {
    (1..=count).map(|n| vec![Scalar::Int(n)]).collect()
}

#[async_trait]
impl Session for FixtureSession {
    async fn execute_transaction(&mut self, _sql: &str) -> Result<(), StoreError> {
        Err(StoreError::new("evaluation must not write"))
    }

    async fn query(&mut self, sql: &str) -> Result<QueryOutput, StoreError> {
        self.queries.push(sql.to_string());
        self.responses.get(sql).cloned().unwrap_or_else(|| {
            Err(StoreError::with_code(
                "42P01",
                format!("no fixture for query: {sql}"),
            ))
        })
    }
}
