//! The database façade.
//!
//! [`DatabaseManager`] owns the pool and composes the statement, timeout,
//! transaction and migration machinery behind one handle. It is built once
//! at startup from a [`Config`] and shared by reference (usually inside an
//! `Arc`) with everything that talks to the store.

use crate::config::Config;
use crate::db::executor::StatementExecutor;
use crate::db::lock::{AdvisoryLock, MIGRATION_LOCK_KEY};
use crate::db::pool::ConnectionPool;
use crate::db::timeout::TimeoutGuard;
use crate::db::transaction::TransactionExecutor;
use crate::error::{DbError, DbResult};
use crate::migrations::{Direction, MigrationReport, MigrationRunner, MigrationSet};
use crate::models::{PoolStatus, QueryParam, RowSet, TransactionUnit};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Statement and transaction execution, as seen by migration steps and
/// other callers that should not depend on the concrete manager.
#[async_trait]
pub trait Database: Send + Sync {
    async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<RowSet>;

    async fn execute_transaction(&self, unit: &TransactionUnit) -> DbResult<Vec<RowSet>>;
}

#[derive(Debug)]
pub struct DatabaseManager {
    pool: Arc<ConnectionPool>,
    executor: StatementExecutor,
    transactions: TransactionExecutor,
    timeouts: TimeoutGuard,
    runner: MigrationRunner,
    advisory_lock: bool,
    shutdown_grace: Duration,
}

impl DatabaseManager {
    /// Build a manager with the standard migration lists.
    ///
    /// No connection is opened until the first statement runs.
    pub fn new(config: &Config) -> DbResult<Self> {
        Self::with_runner(config, MigrationRunner::standard())
    }

    /// Build a manager with custom migration lists.
    pub fn with_runner(config: &Config, runner: MigrationRunner) -> DbResult<Self> {
        config.validate().map_err(DbError::config)?;
        let url = config.connection_url().map_err(DbError::config)?;
        let pool = Arc::new(ConnectionPool::connect_lazy(&url, config.pool_options())?);

        info!(
            url = %config.masked_connection_url(),
            query_timeout_ms = config.query_timeout_ms,
            advisory_lock = config.advisory_lock,
            "Database manager initialized"
        );

        let executor = StatementExecutor::new(Arc::clone(&pool));
        Ok(Self {
            transactions: TransactionExecutor::new(Arc::clone(&pool)),
            timeouts: TimeoutGuard::new(executor.clone(), config.query_timeout()),
            executor,
            pool,
            runner,
            advisory_lock: config.advisory_lock,
            shutdown_grace: config.shutdown_grace(),
        })
    }

    /// Execute one statement on a pooled connection.
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<RowSet> {
        self.executor.execute(sql, params).await
    }

    /// Execute statements atomically on one connection.
    pub async fn execute_transaction(&self, unit: &TransactionUnit) -> DbResult<Vec<RowSet>> {
        self.transactions.execute_transaction(unit).await
    }

    /// Execute one statement, giving up after `timeout` (or the configured
    /// default). The statement itself is not cancelled.
    pub async fn execute_with_timeout(
        &self,
        sql: &str,
        params: &[QueryParam],
        timeout: Option<Duration>,
    ) -> DbResult<RowSet> {
        self.timeouts.execute_with_timeout(sql, params, timeout).await
    }

    /// Apply the full migration list, seed data included.
    pub async fn migrate(&self) -> DbResult<MigrationReport> {
        self.run_migrations(MigrationSet::Full, Direction::Apply)
            .await
    }

    /// Revert the full migration list in reverse order.
    pub async fn rollback(&self) -> DbResult<MigrationReport> {
        self.run_migrations(MigrationSet::Full, Direction::Revert)
            .await
    }

    /// Apply the schema-only list used by test fixtures.
    pub async fn migrate_for_test(&self) -> DbResult<MigrationReport> {
        self.run_migrations(MigrationSet::Test, Direction::Apply)
            .await
    }

    pub async fn rollback_for_test(&self) -> DbResult<MigrationReport> {
        self.run_migrations(MigrationSet::Test, Direction::Revert)
            .await
    }

    /// Drain and close the pool. Further calls fail with [`DbError::PoolClosed`].
    pub async fn end_pool(&self) {
        self.pool.drain(self.shutdown_grace).await;
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    pub fn runner(&self) -> &MigrationRunner {
        &self.runner
    }

    async fn run_migrations(
        &self,
        set: MigrationSet,
        direction: Direction,
    ) -> DbResult<MigrationReport> {
        let lock = if self.advisory_lock {
            let connect_timeout = Duration::from_millis(self.pool.options().connection_timeout_ms);
            Some(
                AdvisoryLock::try_acquire(
                    self.pool.connect_options(),
                    MIGRATION_LOCK_KEY,
                    connect_timeout,
                )
                .await?,
            )
        } else {
            None
        };

        let report = self.runner.run(self, set, direction).await;

        if let Some(lock) = lock {
            if let Err(e) = lock.release().await {
                warn!(error = %e, "Failed to release migration advisory lock");
            }
        }

        report
    }
}

#[async_trait]
impl Database for DatabaseManager {
    async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<RowSet> {
        DatabaseManager::execute(self, sql, params).await
    }

    async fn execute_transaction(&self, unit: &TransactionUnit) -> DbResult<Vec<RowSet>> {
        DatabaseManager::execute_transaction(self, unit).await
    }
}
