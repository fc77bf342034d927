//! Pool observability model.

use serde::{Deserialize, Serialize};

/// Snapshot of connection pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Open physical connections (idle + leased)
    pub total: u32,
    pub idle: u32,
    /// Connections currently leased to executors
    pub active: u32,
    /// Tasks blocked waiting for a connection
    pub waiting: u32,
    /// Configured ceiling
    pub max: u32,
    pub closed: bool,
}

impl PoolStatus {
    /// True when every allowed connection is leased.
    pub fn is_saturated(&self) -> bool {
        self.active >= self.max
    }
}
