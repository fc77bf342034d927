use super::MigrationStep;
use super::report::{Direction, MigrationReport, MigrationSet, StepOutcome};
use super::steps;
use crate::db::{Database, ProcessLock};
use crate::error::DbResult;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Runs ordered migration step lists against a [`Database`].
///
/// Steps run one at a time. A failing step is logged and recorded in the
/// report, and the run carries on with the next step. Reverts walk the list
/// back to front. Only one run may be in progress per runner.
pub struct MigrationRunner {
    full: Vec<Arc<dyn MigrationStep>>,
    test: Vec<Arc<dyn MigrationStep>>,
    lock: ProcessLock,
}

impl fmt::Debug for MigrationRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |steps: &[Arc<dyn MigrationStep>]| {
            steps.iter().map(|s| s.name()).collect::<Vec<_>>()
        };
        f.debug_struct("MigrationRunner")
            .field("full", &names(&self.full))
            .field("test", &names(&self.test))
            .finish()
    }
}

impl MigrationRunner {
    pub fn new(full: Vec<Arc<dyn MigrationStep>>, test: Vec<Arc<dyn MigrationStep>>) -> Self {
        Self {
            full,
            test,
            lock: ProcessLock::new(),
        }
    }

    /// The platform's schema: every step for `Full`, seed data left out of `Test`.
    pub fn standard() -> Self {
        Self::new(steps::full_list(), steps::test_list())
    }

    pub fn steps(&self, set: MigrationSet) -> &[Arc<dyn MigrationStep>] {
        match set {
            MigrationSet::Full => &self.full,
            MigrationSet::Test => &self.test,
        }
    }

    pub async fn migrate_all(&self, db: &dyn Database) -> DbResult<MigrationReport> {
        self.run(db, MigrationSet::Full, Direction::Apply).await
    }

    pub async fn rollback_all(&self, db: &dyn Database) -> DbResult<MigrationReport> {
        self.run(db, MigrationSet::Full, Direction::Revert).await
    }

    pub async fn migrate_for_test(&self, db: &dyn Database) -> DbResult<MigrationReport> {
        self.run(db, MigrationSet::Test, Direction::Apply).await
    }

    pub async fn rollback_for_test(&self, db: &dyn Database) -> DbResult<MigrationReport> {
        self.run(db, MigrationSet::Test, Direction::Revert).await
    }

    /// Run one list in one direction.
    ///
    /// Fails only with [`DbError::MigrationInProgress`](crate::DbError::MigrationInProgress);
    /// step failures are reported in the returned [`MigrationReport`].
    pub async fn run(
        &self,
        db: &dyn Database,
        set: MigrationSet,
        direction: Direction,
    ) -> DbResult<MigrationReport> {
        let _running = self.lock.try_acquire()?;

        let mut ordered: Vec<&Arc<dyn MigrationStep>> = self.steps(set).iter().collect();
        if direction == Direction::Revert {
            ordered.reverse();
        }

        info!(set = %set, direction = %direction, steps = ordered.len(), "Starting migration run");
        let started_at = Utc::now();

        let mut outcomes = Vec::with_capacity(ordered.len());
        for step in ordered {
            outcomes.push(run_step(db, step.as_ref(), direction).await);
        }

        let report = MigrationReport {
            set,
            direction,
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        if report.is_success() {
            info!(set = %set, direction = %direction, "Migration run completed");
        } else {
            error!(
                set = %set,
                direction = %direction,
                failed = ?report.failed_steps(),
                "Migration run completed with failures"
            );
        }
        Ok(report)
    }
}

impl Default for MigrationRunner {
    fn default() -> Self {
        Self::standard()
    }
}

async fn run_step(db: &dyn Database, step: &dyn MigrationStep, direction: Direction) -> StepOutcome {
    let start = Instant::now();
    info!(step = step.name(), direction = %direction, "Running migration step");

    let result = match direction {
        Direction::Apply => step.apply(db).await,
        Direction::Revert => step.revert(db).await,
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => StepOutcome {
            step: step.name().to_string(),
            ok: true,
            error: None,
            elapsed_ms,
        },
        Err(e) => {
            error!(
                step = step.name(),
                direction = %direction,
                error = %e,
                "THIS IS CRITICAL: migration step failed, continuing with remaining steps"
            );
            StepOutcome {
                step: step.name().to_string(),
                ok: false,
                error: Some(e.to_string()),
                elapsed_ms,
            }
        }
    }
}
