//! Atomic multi-statement execution.
//!
//! A [`TransactionUnit`] runs on one leased connection between `BEGIN` and
//! `COMMIT`. The first failing statement aborts the unit: the transaction is
//! rolled back and the statement's error is returned. A failed rollback is
//! logged and the connection is closed instead of returned to the pool, so
//! no later lease inherits an open transaction.

use crate::db::executor::run_statement;
use crate::db::pool::ConnectionPool;
use crate::error::{DbError, DbResult};
use crate::models::{RowSet, TransactionUnit};
use sqlx::Executor;
use sqlx::postgres::PgConnection;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct TransactionExecutor {
    pool: Arc<ConnectionPool>,
}

/// How a unit ended, and whether its connection may go back to the pool.
enum UnitOutcome {
    Committed(Vec<RowSet>),
    Failed { error: DbError, reusable: bool },
}

impl TransactionExecutor {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Run every statement of `unit` atomically.
    ///
    /// Returns one [`RowSet`] per statement, in input order. An empty unit
    /// begins and commits an empty transaction.
    pub async fn execute_transaction(&self, unit: &TransactionUnit) -> DbResult<Vec<RowSet>> {
        let start = Instant::now();
        let mut lease = self.pool.acquire().await?;

        match run_unit(lease.connection(), unit).await {
            UnitOutcome::Committed(results) => {
                lease.release();
                debug!(
                    statements = unit.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Transaction committed"
                );
                Ok(results)
            }
            UnitOutcome::Failed { error, reusable } => {
                if reusable {
                    lease.release();
                } else {
                    lease.discard().await;
                }
                Err(error)
            }
        }
    }
}

async fn run_unit(conn: &mut PgConnection, unit: &TransactionUnit) -> UnitOutcome {
    if let Err(e) = conn.execute("BEGIN").await {
        error!(error = %e, "Failed to begin transaction");
        return UnitOutcome::Failed {
            error: DbError::from_sqlx(e, "BEGIN", Vec::new()),
            reusable: false,
        };
    }

    let mut results = Vec::with_capacity(unit.len());
    for (index, (sql, params)) in unit.iter().enumerate() {
        match run_statement(conn, sql, params).await {
            Ok(row_set) => results.push(row_set),
            Err(error) => {
                warn!(
                    statement = index,
                    total = unit.len(),
                    "Statement failed; rolling back transaction"
                );
                let reusable = rollback(conn).await;
                return UnitOutcome::Failed { error, reusable };
            }
        }
    }

    if let Err(e) = conn.execute("COMMIT").await {
        error!(error = %e, "Failed to commit transaction");
        let reusable = rollback(conn).await;
        return UnitOutcome::Failed {
            error: DbError::from_sqlx(e, "COMMIT", Vec::new()),
            reusable,
        };
    }

    UnitOutcome::Committed(results)
}

/// Best-effort rollback. Returns whether the connection is still usable.
async fn rollback(conn: &mut PgConnection) -> bool {
    match conn.execute("ROLLBACK").await {
        Ok(_) => true,
        Err(e) => {
            error!(error = %e, "Rollback failed; connection will be closed");
            false
        }
    }
}
