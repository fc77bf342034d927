//! Data models for the adoption database engine.
//!
//! This module re-exports all model types used throughout the crate.

pub mod query;
pub mod status;

// Re-export commonly used types
pub use query::{QueryParam, RowSet, Statement, TransactionUnit, render_params};
pub use status::PoolStatus;
