//! Single-statement execution.
//!
//! Every call leases one connection, runs the statement, materializes the
//! rows and returns the lease, whether the statement succeeded or not.
//!
//! Statements without parameters go through the simple query protocol so
//! multi-statement DDL and `DO` blocks run unchanged; parameterized
//! statements are prepared and bound positionally.

use crate::db::params::build_query;
use crate::db::pool::ConnectionPool;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{QueryParam, RowSet, render_params};
use futures_util::TryStreamExt;
use sqlx::postgres::PgConnection;
use sqlx::{Either, Executor};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Runs one statement per call on a pooled connection.
#[derive(Debug, Clone)]
pub struct StatementExecutor {
    pool: Arc<ConnectionPool>,
}

impl StatementExecutor {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Execute `sql` with positional `params` and return the materialized rows.
    ///
    /// Failures are logged with the statement text and rendered parameters
    /// before being returned unchanged to the caller.
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<RowSet> {
        let mut lease = self.pool.acquire().await?;
        let result = run_statement(lease.connection(), sql, params).await;
        lease.release();
        result
    }
}

/// Run one statement on an already-leased connection.
pub(crate) async fn run_statement(
    conn: &mut PgConnection,
    sql: &str,
    params: &[QueryParam],
) -> DbResult<RowSet> {
    let start = Instant::now();
    debug!(sql = %sql, params = params.len(), "Executing statement");

    match collect_rows(conn, sql, params).await {
        Ok(row_set) => {
            debug!(
                rows = row_set.row_count(),
                rows_affected = row_set.rows_affected,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Statement completed"
            );
            Ok(row_set)
        }
        Err(e) => {
            let err = DbError::from_sqlx(e, sql, render_params(params));
            error!(
                sql = %sql,
                params = ?render_params(params),
                sql_state = err.sql_state().unwrap_or(""),
                error = %err,
                "Statement failed"
            );
            Err(err)
        }
    }
}

async fn collect_rows(
    conn: &mut PgConnection,
    sql: &str,
    params: &[QueryParam],
) -> Result<RowSet, sqlx::Error> {
    let mut stream = if params.is_empty() {
        conn.fetch_many(sql)
    } else {
        conn.fetch_many(build_query(sql, params))
    };

    let mut row_set = RowSet::default();
    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(done) => row_set.rows_affected += done.rows_affected(),
            Either::Right(row) => row_set.rows.push(row.to_json_map()),
        }
    }
    Ok(row_set)
}
