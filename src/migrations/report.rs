//! Outcome of a migration run.

use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Apply,
    Revert,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply => write!(f, "apply"),
            Self::Revert => write!(f, "revert"),
        }
    }
}

/// Which step list a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationSet {
    /// Every step, seed data included.
    Full,
    /// Schema-only steps used by test fixtures.
    Test,
}

impl fmt::Display for MigrationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Test => write!(f, "test"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub step: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Per-step results of one run, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub set: MigrationSet,
    pub direction: Direction,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<StepOutcome>,
}

impl MigrationReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.ok)
    }

    /// Names of the steps that failed.
    pub fn failed_steps(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.ok)
            .map(|o| o.step.as_str())
            .collect()
    }

    /// Turn the first failed step into an error.
    pub fn into_result(self) -> DbResult<Self> {
        match self.outcomes.iter().find(|o| !o.ok) {
            Some(failed) => Err(DbError::migration(
                failed.step.clone(),
                failed.error.clone().unwrap_or_default(),
            )),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(step: &str, error: Option<&str>) -> StepOutcome {
        StepOutcome {
            step: step.to_string(),
            ok: error.is_none(),
            error: error.map(str::to_string),
            elapsed_ms: 1,
        }
    }

    fn report(outcomes: Vec<StepOutcome>) -> MigrationReport {
        let now = Utc::now();
        MigrationReport {
            set: MigrationSet::Full,
            direction: Direction::Apply,
            started_at: now,
            finished_at: now,
            outcomes,
        }
    }

    #[test]
    fn test_successful_report() {
        let report = report(vec![outcome("a", None), outcome("b", None)]);
        assert!(report.is_success());
        assert!(report.failed_steps().is_empty());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_failed_report_names_first_failure() {
        let report = report(vec![
            outcome("a", None),
            outcome("b", Some("boom")),
            outcome("c", Some("bang")),
        ]);
        assert!(!report.is_success());
        assert_eq!(report.failed_steps(), vec!["b", "c"]);

        match report.into_result().unwrap_err() {
            DbError::Migration { step, message } => {
                assert_eq!(step, "b");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let json = serde_json::to_value(report(vec![outcome("a", None)])).unwrap();
        assert_eq!(json["direction"], "apply");
        assert_eq!(json["set"], "full");
        assert!(json.get("startedAt").is_some());
        assert_eq!(json["outcomes"][0]["elapsedMs"], 1);
        assert!(json["outcomes"][0].get("error").is_none());
    }
}
