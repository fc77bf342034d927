//! Initial data for a fresh installation: an admin account, one demo
//! shelter and a handful of adoptable pets. Rows use fixed identifiers so
//! re-seeding is a no-op and revert removes exactly what was inserted.

use super::run_unit;
use crate::db::Database;
use crate::error::DbResult;
use crate::migrations::MigrationStep;
use crate::models::{Statement, TransactionUnit};
use crate::params;
use async_trait::async_trait;
use tracing::info;

const SQLSTATE_UNDEFINED_TABLE: &str = "42P01";

const ADMIN_ID: &str = "00000000-0000-4000-8000-000000000001";
const ADMIN_EMAIL: &str = "admin@adoption.local";
/// Not a valid hash: the account is locked until a password reset.
const LOCKED_PASSWORD_HASH: &str = "!locked";

const SHELTER_ID: &str = "00000000-0000-4000-8000-000000000101";

struct DemoPet {
    id: &'static str,
    name: &'static str,
    species: &'static str,
    breed: Option<&'static str>,
    gender: &'static str,
    size: &'static str,
    age_months: i64,
    description_en: &'static str,
    description_es: &'static str,
}

const DEMO_PETS: &[DemoPet] = &[
    DemoPet {
        id: "00000000-0000-4000-8000-000000000201",
        name: "Luna",
        species: "dog",
        breed: Some("Labrador Retriever"),
        gender: "female",
        size: "large",
        age_months: 26,
        description_en: "Gentle, house-trained and great with children.",
        description_es: "Cariñosa, educada en casa y muy buena con niños.",
    },
    DemoPet {
        id: "00000000-0000-4000-8000-000000000202",
        name: "Milo",
        species: "cat",
        breed: Some("Domestic Shorthair"),
        gender: "male",
        size: "small",
        age_months: 8,
        description_en: "Curious young cat who loves window perches.",
        description_es: "Gato joven y curioso al que le encantan las ventanas.",
    },
    DemoPet {
        id: "00000000-0000-4000-8000-000000000203",
        name: "Canela",
        species: "rabbit",
        breed: None,
        gender: "female",
        size: "small",
        age_months: 14,
        description_en: "Calm rabbit, litter-trained, enjoys fresh greens.",
        description_es: "Coneja tranquila, usa arenero y adora las verduras frescas.",
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SeedData;

fn apply_unit() -> TransactionUnit {
    let mut unit = TransactionUnit::default();

    unit.push(Statement::with_params(
        "INSERT INTO users (id, email, password_hash, display_name, role) \
         VALUES ($1::uuid, $2, $3, $4, 'admin') \
         ON CONFLICT DO NOTHING",
        params![ADMIN_ID, ADMIN_EMAIL, LOCKED_PASSWORD_HASH, "Administrator"],
    ));

    unit.push(Statement::with_params(
        "INSERT INTO shelters (id, name, description, email, city, region, country, created_by) \
         VALUES ($1::uuid, $2, $3, $4, $5, $6, $7, $8::uuid) \
         ON CONFLICT DO NOTHING",
        params![
            SHELTER_ID,
            "Happy Tails Demo Shelter",
            "Demonstration shelter created at installation.",
            "shelter@adoption.local",
            "Austin",
            "TX",
            "US",
            ADMIN_ID,
        ],
    ));

    for pet in DEMO_PETS {
        unit.push(Statement::with_params(
            "INSERT INTO pets (id, shelter_id, name, species, breed, gender, size, age_months, \
                               description_en, description_es, is_vaccinated, is_neutered) \
             VALUES ($1::uuid, $2::uuid, $3, $4::pet_species, $5, $6::pet_gender, $7::pet_size, \
                     $8, $9, $10, $11, $12) \
             ON CONFLICT DO NOTHING",
            params![
                pet.id,
                SHELTER_ID,
                pet.name,
                pet.species,
                pet.breed,
                pet.gender,
                pet.size,
                pet.age_months,
                pet.description_en,
                pet.description_es,
                true,
                pet.age_months >= 6,
            ],
        ));
    }

    unit
}

fn revert_unit() -> TransactionUnit {
    let mut unit = TransactionUnit::default();
    unit.push(Statement::with_params(
        "DELETE FROM pets WHERE shelter_id = $1::uuid",
        params![SHELTER_ID],
    ));
    unit.push(Statement::with_params(
        "DELETE FROM shelters WHERE id = $1::uuid",
        params![SHELTER_ID],
    ));
    unit.push(Statement::with_params(
        "DELETE FROM users WHERE id = $1::uuid",
        params![ADMIN_ID],
    ));
    unit
}

#[async_trait]
impl MigrationStep for SeedData {
    fn name(&self) -> &'static str {
        "seed_data"
    }

    async fn apply(&self, db: &dyn Database) -> DbResult<()> {
        run_unit(db, self.name(), apply_unit()).await
    }

    async fn revert(&self, db: &dyn Database) -> DbResult<()> {
        match run_unit(db, self.name(), revert_unit()).await {
            Err(e) if e.sql_state() == Some(SQLSTATE_UNDEFINED_TABLE) => {
                info!(step = self.name(), "Seeded tables are gone; nothing to revert");
                Ok(())
            }
            other => other,
        }
    }
}
