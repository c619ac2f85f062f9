//! Collaborators the stepper drives: the executor and the operator.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Result, StepError};
use crate::plan::ChangeItem;

use super::machine::{AbortReason, StepAction};

/// Performs changes and looks up diffs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Executor: Send + Sync {
    /// Applies a single item. May change real infrastructure.
    ///
    /// # Errors
    ///
    /// Returns an error if the change could not be applied.
    async fn apply(&self, item: &ChangeItem) -> Result<()>;

    /// Returns displayable details for an item. Read-only and repeatable.
    ///
    /// # Errors
    ///
    /// Returns an error if the details could not be fetched.
    async fn detail(&self, item: &ChangeItem) -> Result<String>;
}

/// Solicits decisions from, and reports progress to, the operator.
#[async_trait]
pub trait Operator: Send {
    /// Asks what to do with `item`.
    ///
    /// # Errors
    ///
    /// Returns a transient error if reading failed, or a non-transient one
    /// if no more input will ever arrive.
    async fn prompt_action(&mut self, item: &ChangeItem) -> Result<StepAction>;

    /// Asks the operator to confirm aborting the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer could not be read.
    async fn confirm_abort(&mut self, item: &ChangeItem) -> Result<bool>;

    /// Asks whether to continue after `item` failed to apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer could not be read.
    async fn confirm_continue(&mut self, item: &ChangeItem) -> Result<bool>;

    /// Reports progress.
    fn notify(&mut self, event: StepEvent<'_>);
}

/// Progress reported to the operator while stepping.
#[derive(Debug)]
pub enum StepEvent<'a> {
    /// The first visited item of a layer is about to be shown.
    LayerStarted {
        /// 1-based layer number.
        index: usize,
        /// Number of layers in the plan.
        total: usize,
        /// Whether the layer breaks a dependency cycle.
        forced: bool,
    },
    /// An item is about to be prompted for.
    ItemStarted {
        /// The item.
        item: &'a ChangeItem,
        /// 1-based position among visited items.
        position: usize,
        /// Number of items that will be visited.
        total: usize,
    },
    /// Details fetched for an item.
    Detail {
        /// The item.
        item: &'a ChangeItem,
        /// Text returned by the executor.
        text: &'a str,
    },
    /// An apply is starting.
    Applying {
        /// The item.
        item: &'a ChangeItem,
    },
    /// An apply finished; check `item.status` for the outcome.
    Applied {
        /// The item.
        item: &'a ChangeItem,
        /// Wall-clock time the apply took.
        elapsed: Duration,
        /// The failure, if the apply failed.
        error: Option<&'a StepError>,
    },
    /// An item was skipped.
    Skipped {
        /// The item.
        item: &'a ChangeItem,
    },
    /// A non-fatal problem while handling an item.
    Error {
        /// The item.
        item: &'a ChangeItem,
        /// What went wrong.
        error: &'a StepError,
    },
    /// The run is stopping early.
    Aborted {
        /// Why.
        reason: AbortReason,
    },
}
