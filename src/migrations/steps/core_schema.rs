use super::run_unit;
use crate::db::Database;
use crate::error::DbResult;
use crate::migrations::MigrationStep;
use crate::models::TransactionUnit;
use async_trait::async_trait;

/// Users, shelters, pets and the tables hanging off them.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateCoreSchema;

/// Tables that carry an `updated_at` column maintained by trigger.
const TIMESTAMPED_TABLES: &[&str] = &["users", "shelters", "pets", "adoption_applications"];

const CREATE_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        display_name TEXT NOT NULL,
        role user_role NOT NULL DEFAULT 'adopter',
        preferred_language TEXT NOT NULL DEFAULT 'en'
            CHECK (preferred_language IN ('en', 'es')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS shelters (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        description TEXT,
        email TEXT,
        phone TEXT,
        website TEXT,
        address_line TEXT,
        city TEXT NOT NULL,
        region TEXT,
        country TEXT NOT NULL DEFAULT 'US',
        latitude REAL,
        longitude REAL,
        created_by UUID REFERENCES users(id) ON DELETE SET NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS pets (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        shelter_id UUID NOT NULL REFERENCES shelters(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        species pet_species NOT NULL,
        breed TEXT,
        gender pet_gender NOT NULL DEFAULT 'unknown',
        size pet_size,
        age_months INTEGER CHECK (age_months >= 0),
        weight_kg REAL CHECK (weight_kg > 0),
        description_en TEXT,
        description_es TEXT,
        status pet_status NOT NULL DEFAULT 'available',
        is_vaccinated BOOLEAN NOT NULL DEFAULT FALSE,
        is_neutered BOOLEAN NOT NULL DEFAULT FALSE,
        good_with_kids BOOLEAN,
        good_with_pets BOOLEAN,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS pet_photos (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        pet_id UUID NOT NULL REFERENCES pets(id) ON DELETE CASCADE,
        url TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (pet_id, sort_order)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS adoption_applications (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        pet_id UUID NOT NULL REFERENCES pets(id) ON DELETE CASCADE,
        applicant_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        status application_status NOT NULL DEFAULT 'submitted',
        message TEXT,
        reviewed_by UUID REFERENCES users(id) ON DELETE SET NULL,
        reviewed_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (pet_id, applicant_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS favorites (
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        pet_id UUID NOT NULL REFERENCES pets(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (user_id, pet_id)
    )"#,
];

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_pets_shelter_id ON pets (shelter_id)",
    "CREATE INDEX IF NOT EXISTS idx_pets_status_species ON pets (status, species)",
    "CREATE INDEX IF NOT EXISTS idx_pet_photos_pet_id ON pet_photos (pet_id)",
    "CREATE INDEX IF NOT EXISTS idx_applications_applicant_id ON adoption_applications (applicant_id)",
    "CREATE INDEX IF NOT EXISTS idx_applications_pet_status ON adoption_applications (pet_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_favorites_pet_id ON favorites (pet_id)",
];

const CREATE_UPDATED_AT_FUNCTION: &str = r#"CREATE OR REPLACE FUNCTION set_updated_at()
    RETURNS TRIGGER LANGUAGE plpgsql AS $$
    BEGIN
        NEW.updated_at = now();
        RETURN NEW;
    END
    $$"#;

/// Dependents first.
const DROP_TABLES: &[&str] = &[
    "favorites",
    "adoption_applications",
    "pet_photos",
    "pets",
    "shelters",
    "users",
];

fn updated_at_trigger_sql(table: &str) -> [String; 2] {
    [
        format!("DROP TRIGGER IF EXISTS trg_{table}_updated_at ON {table}"),
        format!(
            "CREATE TRIGGER trg_{table}_updated_at BEFORE UPDATE ON {table} \
             FOR EACH ROW EXECUTE FUNCTION set_updated_at()"
        ),
    ]
}

fn apply_unit() -> TransactionUnit {
    let mut statements: Vec<String> = CREATE_TABLES.iter().map(|s| s.to_string()).collect();
    statements.extend(CREATE_INDEXES.iter().map(|s| s.to_string()));
    statements.push(CREATE_UPDATED_AT_FUNCTION.to_string());
    for table in TIMESTAMPED_TABLES {
        statements.extend(updated_at_trigger_sql(table));
    }
    TransactionUnit::from_sql(statements)
}

fn revert_unit() -> TransactionUnit {
    let mut statements: Vec<String> = DROP_TABLES
        .iter()
        .map(|t| format!("DROP TABLE IF EXISTS {t} CASCADE"))
        .collect();
    statements.push("DROP FUNCTION IF EXISTS set_updated_at() CASCADE".to_string());
    TransactionUnit::from_sql(statements)
}

#[async_trait]
impl MigrationStep for CreateCoreSchema {
    fn name(&self) -> &'static str {
        "create_core_schema"
    }

    async fn apply(&self, db: &dyn Database) -> DbResult<()> {
        run_unit(db, self.name(), apply_unit()).await
    }

    async fn revert(&self, db: &dyn Database) -> DbResult<()> {
        run_unit(db, self.name(), revert_unit()).await
    }
}
