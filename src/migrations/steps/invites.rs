use super::run_unit;
use crate::db::Database;
use crate::error::DbResult;
use crate::migrations::MigrationStep;
use crate::models::TransactionUnit;
use async_trait::async_trait;

/// Staff and admin invitations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateInvites;

const CREATE_INVITES: &str = r#"CREATE TABLE IF NOT EXISTS invites (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email TEXT NOT NULL,
        token TEXT NOT NULL UNIQUE,
        role user_role NOT NULL DEFAULT 'shelter_staff',
        shelter_id UUID REFERENCES shelters(id) ON DELETE CASCADE,
        invited_by UUID REFERENCES users(id) ON DELETE SET NULL,
        status invite_status NOT NULL DEFAULT 'pending',
        expires_at TIMESTAMPTZ NOT NULL,
        accepted_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CHECK (expires_at > created_at)
    )"#;

const APPLY: &[&str] = &[
    CREATE_INVITES,
    // At most one open invite per address.
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_invites_pending_email \
     ON invites (lower(email)) WHERE status = 'pending'",
    "CREATE INDEX IF NOT EXISTS idx_invites_expires_at ON invites (expires_at)",
    "CREATE INDEX IF NOT EXISTS idx_invites_shelter_id ON invites (shelter_id)",
];

const REVERT: &[&str] = &["DROP TABLE IF EXISTS invites CASCADE"];

#[async_trait]
impl MigrationStep for CreateInvites {
    fn name(&self) -> &'static str {
        "create_invites"
    }

    async fn apply(&self, db: &dyn Database) -> DbResult<()> {
        run_unit(db, self.name(), TransactionUnit::from_sql(APPLY.iter().copied())).await
    }

    async fn revert(&self, db: &dyn Database) -> DbResult<()> {
        run_unit(db, self.name(), TransactionUnit::from_sql(REVERT.iter().copied())).await
    }
}
