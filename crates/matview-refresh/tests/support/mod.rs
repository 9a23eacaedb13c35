#![allow(dead_code)]

use std::collections::BTreeSet;

use async_trait::async_trait;
use matview_core::{QueryOutput, Session, StoreError};

/// What happened to one `execute_transaction` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Committed(String),
    RolledBack(String),
}

/// In-memory store that tracks created objects transactionally.
///
/// Understands `CREATE INDEX <name>`, `CREATE MATERIALIZED VIEW <name>` and
/// `DROP MATERIALIZED VIEW IF EXISTS <name>;`, one statement per line.
/// Scripts containing an injected failure pattern are rolled back.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    pub objects: BTreeSet<String>,
    pub failures: Vec<(String, StoreError)>,
    pub calls: Vec<Call>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, pattern: &str, error: StoreError) -> Self {
        self.failures.push((pattern.to_string(), error));
        self
    }

    pub fn committed(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Committed(sql) => Some(sql.as_str()),
                Call::RolledBack(_) => None,
            })
            .collect()
    }

    fn apply(&self, sql: &str) -> Result<BTreeSet<String>, StoreError> {
        if let Some((_, err)) = self.failures.iter().find(|(pattern, _)| sql.contains(pattern)) {
            return Err(err.clone());
        }

        let mut staged = self.objects.clone();
        for line in sql.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix("DROP MATERIALIZED VIEW IF EXISTS ") {
                staged.remove(rest.trim_end_matches(';'));
            } else if let Some(name) = created_name(line) {
                if !staged.insert(name.to_string()) {
                    return Err(StoreError::with_code(
                        "42P07",
                        format!("relation \"{name}\" already exists"),
                    ));
                }
            }
        }
        Ok(staged)
    }
}

fn created_name(line: &str) -> Option<&str> {
    line.strip_prefix("CREATE INDEX ")
        .or_else(|| line.strip_prefix("CREATE MATERIALIZED VIEW "))
        .and_then(|rest| rest.split_whitespace().next())
}

#[async_trait]
impl Session for ScriptedSession {
    async fn execute_transaction(&mut self, sql: &str) -> Result<(), StoreError> {
        match self.apply(sql) {
            Ok(staged) => {
                self.objects = staged;
                self.calls.push(Call::Committed(sql.to_string()));
                Ok(())
            }
            Err(err) => {
                self.calls.push(Call::RolledBack(sql.to_string()));
                Err(err)
            }
        }
    }

    async fn query(&mut self, _sql: &str) -> Result<QueryOutput, StoreError> {
        Err(StoreError::new("queries are not scripted"))
    }
}
