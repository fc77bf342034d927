use super::run_unit;
use crate::db::Database;
use crate::error::DbResult;
use crate::migrations::MigrationStep;
use crate::models::TransactionUnit;
use async_trait::async_trait;

/// Enumerated column types, in creation order.
const ENUM_TYPES: &[(&str, &[&str])] = &[
    (
        "pet_species",
        &["dog", "cat", "rabbit", "bird", "small_mammal", "reptile", "other"],
    ),
    ("pet_gender", &["male", "female", "unknown"]),
    ("pet_size", &["small", "medium", "large", "extra_large"]),
    ("pet_status", &["available", "pending", "adopted", "on_hold"]),
    ("user_role", &["adopter", "shelter_staff", "admin"]),
    (
        "application_status",
        &["submitted", "under_review", "approved", "rejected", "withdrawn"],
    ),
    ("invite_status", &["pending", "accepted", "expired", "revoked"]),
];

/// Creates the enumerated types every table depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateEnumTypes;

fn create_type_sql(name: &str, labels: &[&str]) -> String {
    let labels = labels
        .iter()
        .map(|l| format!("'{}'", l))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "DO $$ BEGIN \
             CREATE TYPE {name} AS ENUM ({labels}); \
         EXCEPTION WHEN duplicate_object THEN NULL; \
         END $$"
    )
}

#[async_trait]
impl MigrationStep for CreateEnumTypes {
    fn name(&self) -> &'static str {
        "create_enum_types"
    }

    async fn apply(&self, db: &dyn Database) -> DbResult<()> {
        let unit = TransactionUnit::from_sql(
            ENUM_TYPES
                .iter()
                .map(|(name, labels)| create_type_sql(name, labels)),
        );
        run_unit(db, self.name(), unit).await
    }

    async fn revert(&self, db: &dyn Database) -> DbResult<()> {
        let unit = TransactionUnit::from_sql(
            ENUM_TYPES
                .iter()
                .rev()
                .map(|(name, _)| format!("DROP TYPE IF EXISTS {name} CASCADE")),
        );
        run_unit(db, self.name(), unit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_type_sql_is_idempotent_block() {
        let sql = create_type_sql("pet_size", &["small", "large"]);
        assert!(sql.starts_with("DO $$ BEGIN"));
        assert!(sql.contains("CREATE TYPE pet_size AS ENUM ('small', 'large');"));
        assert!(sql.contains("EXCEPTION WHEN duplicate_object THEN NULL;"));
    }

    #[test]
    fn test_all_platform_types_present() {
        let names: Vec<_> = ENUM_TYPES.iter().map(|(n, _)| *n).collect();
        for expected in ["pet_species", "user_role", "application_status", "invite_status"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }
}
