//! The platform's migration steps, in apply order.

mod core_schema;
mod enums;
mod invites;
mod search_index;
mod seed;

pub use core_schema::CreateCoreSchema;
pub use enums::CreateEnumTypes;
pub use invites::CreateInvites;
pub use search_index::CreateSearchIndex;
pub use seed::SeedData;

use super::MigrationStep;
use crate::db::Database;
use crate::error::DbResult;
use crate::models::TransactionUnit;
use std::sync::Arc;
use tracing::debug;

/// Every step, seed data last.
pub fn full_list() -> Vec<Arc<dyn MigrationStep>> {
    vec![
        Arc::new(CreateEnumTypes),
        Arc::new(CreateCoreSchema),
        Arc::new(CreateSearchIndex),
        Arc::new(CreateInvites),
        Arc::new(SeedData),
    ]
}

/// Schema without seed data.
pub fn test_list() -> Vec<Arc<dyn MigrationStep>> {
    vec![
        Arc::new(CreateEnumTypes),
        Arc::new(CreateCoreSchema),
        Arc::new(CreateSearchIndex),
        Arc::new(CreateInvites),
    ]
}

/// Run `unit` as one transaction.
///
/// Any failure means the whole unit was rolled back, so it is reported as-is.
/// Steps make re-runs safe through their own SQL guards.
pub(crate) async fn run_unit(db: &dyn Database, step: &str, unit: TransactionUnit) -> DbResult<()> {
    let statements = unit.len();
    db.execute_transaction(&unit).await?;
    debug!(step = step, statements = statements, "Migration unit committed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::DbError;
    use crate::models::{QueryParam, RowSet};
    use async_trait::async_trait;

    /// Rejects every unit with the given SQLSTATE, as the store does when a
    /// statement inside the transaction fails.
    struct RejectingDb {
        sql_state: &'static str,
    }

    #[async_trait]
    impl Database for RejectingDb {
        async fn execute(&self, _sql: &str, _params: &[QueryParam]) -> DbResult<RowSet> {
            Ok(RowSet::default())
        }

        async fn execute_transaction(&self, unit: &TransactionUnit) -> DbResult<Vec<RowSet>> {
            Err(DbError::statement(
                "relation already exists",
                Some(self.sql_state.to_string()),
                unit.statements[0].clone(),
                Vec::new(),
            ))
        }
    }

    #[tokio::test]
    async fn test_run_unit_reports_rolled_back_duplicates() {
        let unit = TransactionUnit::from_sql(["CREATE TABLE a (id int)", "CREATE TABLE b (id int)"]);

        for code in ["42P07", "42710", "42701"] {
            let err = run_unit(&RejectingDb { sql_state: code }, "create_pair", unit.clone())
                .await
                .unwrap_err();
            assert_eq!(err.sql_state(), Some(code));
        }
    }

    #[test]
    fn test_lists_share_prefix() {
        let full: Vec<_> = full_list().iter().map(|s| s.name()).collect();
        let test: Vec<_> = test_list().iter().map(|s| s.name()).collect();
        assert_eq!(full.len(), 5);
        assert_eq!(full[..4], test[..]);
        assert_eq!(full[4], "seed_data");
    }
}
