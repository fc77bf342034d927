//! Bilingual full-text search over pets and shelters.
//!
//! Each searchable table gets one `tsvector` column per language, kept
//! current by a `BEFORE INSERT OR UPDATE` trigger and indexed with GIN.
//! Spanish vectors fall back to the English description when no Spanish
//! text exists.

use super::run_unit;
use crate::db::Database;
use crate::error::DbResult;
use crate::migrations::MigrationStep;
use crate::models::TransactionUnit;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct CreateSearchIndex;

const PET_DOCUMENT_FUNCTION: &str = r#"CREATE OR REPLACE FUNCTION pet_search_document(
        cfg regconfig, p_name TEXT, p_breed TEXT, p_species TEXT, p_description TEXT)
    RETURNS tsvector LANGUAGE sql IMMUTABLE AS $$
        SELECT setweight(to_tsvector(cfg, coalesce(p_name, '')), 'A')
            || setweight(to_tsvector(cfg, coalesce(p_breed, '') || ' ' || coalesce(p_species, '')), 'B')
            || setweight(to_tsvector(cfg, coalesce(p_description, '')), 'C')
    $$"#;

const SHELTER_DOCUMENT_FUNCTION: &str = r#"CREATE OR REPLACE FUNCTION shelter_search_document(
        cfg regconfig, p_name TEXT, p_city TEXT, p_region TEXT, p_description TEXT)
    RETURNS tsvector LANGUAGE sql IMMUTABLE AS $$
        SELECT setweight(to_tsvector(cfg, coalesce(p_name, '')), 'A')
            || setweight(to_tsvector(cfg, coalesce(p_city, '') || ' ' || coalesce(p_region, '')), 'B')
            || setweight(to_tsvector(cfg, coalesce(p_description, '')), 'C')
    $$"#;

const PET_TRIGGER_FUNCTION: &str = r#"CREATE OR REPLACE FUNCTION pets_search_vector_refresh()
    RETURNS TRIGGER LANGUAGE plpgsql AS $$
    BEGIN
        NEW.search_vector_en := pet_search_document(
            'english', NEW.name, NEW.breed, NEW.species::text, NEW.description_en);
        NEW.search_vector_es := pet_search_document(
            'spanish', NEW.name, NEW.breed, NEW.species::text,
            coalesce(NEW.description_es, NEW.description_en));
        RETURN NEW;
    END
    $$"#;

const SHELTER_TRIGGER_FUNCTION: &str = r#"CREATE OR REPLACE FUNCTION shelters_search_vector_refresh()
    RETURNS TRIGGER LANGUAGE plpgsql AS $$
    BEGIN
        NEW.search_vector_en := shelter_search_document(
            'english', NEW.name, NEW.city, NEW.region, NEW.description);
        NEW.search_vector_es := shelter_search_document(
            'spanish', NEW.name, NEW.city, NEW.region, NEW.description);
        RETURN NEW;
    END
    $$"#;

const BACKFILL_PETS: &str = r#"UPDATE pets SET
        search_vector_en = pet_search_document(
            'english', name, breed, species::text, description_en),
        search_vector_es = pet_search_document(
            'spanish', name, breed, species::text, coalesce(description_es, description_en))
    WHERE search_vector_en IS NULL OR search_vector_es IS NULL"#;

const BACKFILL_SHELTERS: &str = r#"UPDATE shelters SET
        search_vector_en = shelter_search_document('english', name, city, region, description),
        search_vector_es = shelter_search_document('spanish', name, city, region, description)
    WHERE search_vector_en IS NULL OR search_vector_es IS NULL"#;

const SEARCHABLE_TABLES: &[&str] = &["pets", "shelters"];
const LANGUAGES: &[&str] = &["en", "es"];

fn apply_unit() -> TransactionUnit {
    let mut statements = Vec::new();

    for table in SEARCHABLE_TABLES {
        for lang in LANGUAGES {
            statements.push(format!(
                "ALTER TABLE {table} ADD COLUMN IF NOT EXISTS search_vector_{lang} tsvector"
            ));
        }
    }

    statements.push(PET_DOCUMENT_FUNCTION.to_string());
    statements.push(SHELTER_DOCUMENT_FUNCTION.to_string());
    statements.push(PET_TRIGGER_FUNCTION.to_string());
    statements.push(SHELTER_TRIGGER_FUNCTION.to_string());

    for table in SEARCHABLE_TABLES {
        statements.push(format!(
            "DROP TRIGGER IF EXISTS trg_{table}_search_vector ON {table}"
        ));
        statements.push(format!(
            "CREATE TRIGGER trg_{table}_search_vector BEFORE INSERT OR UPDATE ON {table} \
             FOR EACH ROW EXECUTE FUNCTION {table}_search_vector_refresh()"
        ));
        for lang in LANGUAGES {
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_search_{lang} \
                 ON {table} USING GIN (search_vector_{lang})"
            ));
        }
    }

    statements.push(BACKFILL_PETS.to_string());
    statements.push(BACKFILL_SHELTERS.to_string());
    TransactionUnit::from_sql(statements)
}

/// Works whether or not the core tables still exist.
fn revert_unit() -> TransactionUnit {
    let mut statements = vec![
        "DROP FUNCTION IF EXISTS pets_search_vector_refresh() CASCADE".to_string(),
        "DROP FUNCTION IF EXISTS shelters_search_vector_refresh() CASCADE".to_string(),
    ];
    for table in SEARCHABLE_TABLES {
        for lang in LANGUAGES {
            // Dropping the column drops its GIN index with it.
            statements.push(format!(
                "ALTER TABLE IF EXISTS {table} DROP COLUMN IF EXISTS search_vector_{lang}"
            ));
        }
    }
    statements.push(
        "DROP FUNCTION IF EXISTS pet_search_document(regconfig, TEXT, TEXT, TEXT, TEXT)".to_string(),
    );
    statements.push(
        "DROP FUNCTION IF EXISTS shelter_search_document(regconfig, TEXT, TEXT, TEXT, TEXT)"
            .to_string(),
    );
    TransactionUnit::from_sql(statements)
}

#[async_trait]
impl MigrationStep for CreateSearchIndex {
    fn name(&self) -> &'static str {
        "create_search_index"
    }

    async fn apply(&self, db: &dyn Database) -> DbResult<()> {
        run_unit(db, self.name(), apply_unit()).await
    }

    async fn revert(&self, db: &dyn Database) -> DbResult<()> {
        run_unit(db, self.name(), revert_unit()).await
    }
}
