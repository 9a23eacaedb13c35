use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Column, Connection, Executor, Statement};

use matview_core::{QueryOutput, Session, StoreError};

use crate::decode::decode_row;

/// A single Postgres connection owned by one run.
#[derive(Debug)]
pub struct PgSession {
    conn: PgConnection,
}

impl PgSession {
    /// Open one connection using caller-provided options.
    pub async fn connect(options: &PgConnectOptions) -> Result<Self, StoreError> {
        let conn = PgConnection::connect_with(options)
            .await
            .map_err(to_store_error)?;
        Ok(Self { conn })
    }

    /// Terminate the connection gracefully.
    pub async fn close(self) -> Result<(), StoreError> {
        self.conn.close().await.map_err(to_store_error)
    }
}

#[async_trait]
impl Session for PgSession {
    async fn execute_transaction(&mut self, sql: &str) -> Result<(), StoreError> {
        let mut tx = self.conn.begin().await.map_err(to_store_error)?;

        if let Err(err) = (&mut *tx).execute(sqlx::raw_sql(sql)).await {
            let err = to_store_error(err);
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(
                    event = "rollback_failed",
                    error = %to_store_error(rollback_err)
                );
            }
            return Err(err);
        }

        tx.commit().await.map_err(to_store_error)
    }

    async fn query(&mut self, sql: &str) -> Result<QueryOutput, StoreError> {
        let statement = (&mut self.conn)
            .prepare(sql)
            .await
            .map_err(to_store_error)?;
        let columns = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let rows = statement
            .query()
            .fetch_all(&mut self.conn)
            .await
            .map_err(to_store_error)?;
        let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;

        Ok(QueryOutput::new(columns, rows))
    }
}

/// Convert a driver error, keeping the SQLSTATE when the server sent one.
pub fn to_store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => StoreError::with_code(code.into_owned(), db_err.message()),
            None => StoreError::new(db_err.message()),
        },
        _ => StoreError::new(err.to_string()),
    }
}
