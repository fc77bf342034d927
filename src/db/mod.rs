//! Database access layer.
//!
//! This module provides:
//! - Connection pool management with RAII leases
//! - Single-statement and deadline-bounded execution
//! - Atomic multi-statement transactions
//! - Row materialization with camelCase field names
//! - Migration locking
//! - The [`DatabaseManager`] façade

pub mod executor;
#[macro_use]
pub mod macros;
pub mod lock;
pub mod manager;
pub(crate) mod params;
pub mod pool;
pub mod timeout;
pub mod transaction;
pub mod types;

pub use executor::StatementExecutor;
pub use lock::{AdvisoryLock, MIGRATION_LOCK_KEY, ProcessLock};
pub use manager::{Database, DatabaseManager};
pub use pool::{ConnectionPool, Lease};
pub use timeout::TimeoutGuard;
pub use transaction::TransactionExecutor;
