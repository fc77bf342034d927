//! Schema migrations.
//!
//! A migration is an ordered list of [`MigrationStep`]s, each able to apply
//! and revert one slice of the schema. Steps are written to be idempotent so
//! a list can be re-applied against a database that already has it.

mod report;
mod runner;
pub mod steps;

pub use report::{Direction, MigrationReport, MigrationSet, StepOutcome};
pub use runner::MigrationRunner;

use crate::db::Database;
use crate::error::DbResult;
use async_trait::async_trait;

#[async_trait]
pub trait MigrationStep: Send + Sync {
    /// Stable identifier used in logs and reports.
    fn name(&self) -> &'static str;

    async fn apply(&self, db: &dyn Database) -> DbResult<()>;

    async fn revert(&self, db: &dyn Database) -> DbResult<()>;
}
