//! Adoption DB Library
//!
//! Connection pooling, statement and transaction execution, and schema
//! migrations for the pet adoption platform's PostgreSQL database.

pub mod config;
pub mod db;
pub mod error;
pub mod migrations;
pub mod models;

pub use config::Config;
pub use db::{Database, DatabaseManager};
pub use error::{DbError, DbResult};
