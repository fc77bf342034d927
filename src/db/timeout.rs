//! Deadline-bounded execution.
//!
//! The statement runs on its own task. When the deadline passes the caller
//! gets [`DbError::QueryTimeout`] and the task is left to finish, so its lease
//! is still returned to the pool. The statement is not cancelled at the
//! store: a timed-out write may have been applied.

use crate::db::executor::StatementExecutor;
use crate::error::{DbError, DbResult};
use crate::models::{QueryParam, RowSet};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct TimeoutGuard {
    executor: StatementExecutor,
    default_timeout: Duration,
}

impl TimeoutGuard {
    pub fn new(executor: StatementExecutor, default_timeout: Duration) -> Self {
        Self {
            executor,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Execute with a deadline, `timeout` overriding the default when given.
    pub async fn execute_with_timeout(
        &self,
        sql: &str,
        params: &[QueryParam],
        timeout: Option<Duration>,
    ) -> DbResult<RowSet> {
        let deadline = timeout.unwrap_or(self.default_timeout);

        let executor = self.executor.clone();
        let owned_sql = sql.to_string();
        let owned_params = params.to_vec();
        let task =
            tokio::spawn(async move { executor.execute(&owned_sql, &owned_params).await });

        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(DbError::internal(format!(
                "Statement task failed: {}",
                join_err
            ))),
            Err(_) => {
                let timeout_ms = deadline.as_millis() as u64;
                warn!(
                    sql = %sql,
                    timeout_ms = timeout_ms,
                    "Statement exceeded deadline; abandoning wait"
                );
                Err(DbError::query_timeout(timeout_ms, sql))
            }
        }
    }
}
