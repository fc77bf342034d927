//! Mutual exclusion for migration runs.
//!
//! Two layers: a process-local flag rejects overlapping runs inside one
//! process, and a PostgreSQL session advisory lock rejects runs from other
//! processes against the same database.
//!
//! The advisory lock lives on a dedicated connection opened outside the
//! pool. Session locks belong to the connection that took them, and the
//! migration steps themselves need pool connections, so holding the lock on
//! a pooled connection would starve a pool of size one.

use crate::error::{DbError, DbResult};
use sqlx::Connection;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Advisory lock key shared by every process migrating this schema.
pub const MIGRATION_LOCK_KEY: i64 = i64::from_be_bytes(*b"petadopt");

/// Process-local migration flag.
#[derive(Debug, Default)]
pub struct ProcessLock {
    inner: Mutex<()>,
}

impl ProcessLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag, failing immediately if a run is already in progress.
    pub fn try_acquire(&self) -> DbResult<MutexGuard<'_, ()>> {
        self.inner
            .try_lock()
            .map_err(|_| DbError::MigrationInProgress)
    }
}

/// A held session advisory lock.
///
/// Dropping the guard without calling [`AdvisoryLock::release`] closes the
/// underlying connection, which also releases the lock server-side.
#[derive(Debug)]
pub struct AdvisoryLock {
    conn: PgConnection,
    key: i64,
}

impl AdvisoryLock {
    /// Try to take the lock without waiting.
    ///
    /// Opening the lock connection is bounded by `connect_timeout`. Fails with
    /// [`DbError::MigrationInProgress`] when another session holds the lock.
    pub async fn try_acquire(
        options: &PgConnectOptions,
        key: i64,
        connect_timeout: Duration,
    ) -> DbResult<Self> {
        let mut conn =
            match tokio::time::timeout(connect_timeout, PgConnection::connect_with(options)).await {
                Ok(conn) => conn?,
                Err(_) => {
                    return Err(DbError::connection(
                        format!(
                            "Lock connection not established within {}ms",
                            connect_timeout.as_millis()
                        ),
                        "Check that the database host is reachable",
                    ));
                }
            };

        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(key)
            .fetch_one(&mut conn)
            .await?;

        if !locked {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Error closing lock connection");
            }
            return Err(DbError::MigrationInProgress);
        }

        debug!(lock_key = key, "Advisory lock acquired");
        Ok(Self { conn, key })
    }

    /// Unlock and close the lock connection.
    pub async fn release(mut self) -> DbResult<()> {
        let unlocked: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
            .bind(self.key)
            .fetch_one(&mut self.conn)
            .await?;

        if !unlocked {
            warn!(lock_key = self.key, "Advisory lock unlock returned false");
        }

        self.conn.close().await?;
        debug!(lock_key = self.key, "Advisory lock released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_is_stable() {
        assert_eq!(MIGRATION_LOCK_KEY, 0x7065_7461_646f_7074);
    }

    #[tokio::test]
    async fn test_process_lock_rejects_second_holder() {
        let lock = ProcessLock::new();
        let guard = lock.try_acquire().unwrap();
        assert!(matches!(
            lock.try_acquire().unwrap_err(),
            DbError::MigrationInProgress
        ));
        drop(guard);
        assert!(lock.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn test_advisory_lock_connect_is_bounded() {
        // Accepts the TCP handshake but never answers the startup exchange.
        let silent = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = silent.local_addr().unwrap().port();
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(port)
            .username("adoption")
            .database("adoption");

        let started = std::time::Instant::now();
        let err = AdvisoryLock::try_acquire(&options, MIGRATION_LOCK_KEY, Duration::from_millis(200))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Connection { .. }), "unexpected error: {err:?}");
        assert!(err.to_string().contains("200ms"));
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(silent);
    }
}
