//! Results of a stepping run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::plan::{ChangeItem, ItemStatus};

use super::machine::AbortReason;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every visited item was closed.
    Completed,
    /// The run stopped early.
    Aborted {
        /// Why the run stopped.
        reason: AbortReason,
    },
}

/// Time taken by one apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyTiming {
    /// Item address.
    pub id: String,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// Counts of executed items by final status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Items applied successfully.
    pub completed: usize,
    /// Items skipped.
    pub skipped: usize,
    /// Items whose apply failed.
    pub failed: usize,
}

/// Accumulated result of [`super::Stepper::run`].
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Items that reached completed, skipped, or failed, in visitation order.
    pub executed: Vec<ChangeItem>,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Apply durations, in visitation order.
    pub timings: Vec<ApplyTiming>,
    /// When stepping began.
    pub started_at: DateTime<Utc>,
    /// When stepping ended.
    pub finished_at: DateTime<Utc>,
}

impl StepReport {
    /// Returns counts by status.
    #[must_use]
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for item in &self.executed {
            match item.status {
                ItemStatus::Completed => counts.completed += 1,
                ItemStatus::Skipped => counts.skipped += 1,
                ItemStatus::Failed => counts.failed += 1,
                ItemStatus::Pending | ItemStatus::Approved => {}
            }
        }
        counts
    }

    /// Returns true if the run was not aborted.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed)
    }

    /// Returns the abort reason, if the run was aborted.
    #[must_use]
    pub const fn abort_reason(&self) -> Option<AbortReason> {
        match self.outcome {
            RunOutcome::Completed => None,
            RunOutcome::Aborted { reason } => Some(reason),
        }
    }

    /// Returns the apply duration recorded for `id`.
    #[must_use]
    pub fn elapsed_for(&self, id: &str) -> Option<Duration> {
        self.timings.iter().find(|t| t.id == id).map(|t| t.elapsed)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Aborted { reason } => write!(f, "{reason}"),
        }
    }
}

impl std::fmt::Display for StepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts = self.counts();
        write!(
            f,
            "Executed {} items ({}): {} completed, {} skipped, {} failed",
            self.executed.len(),
            self.outcome,
            counts.completed,
            counts.skipped,
            counts.failed
        )
    }
}
