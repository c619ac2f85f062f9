//! Per-item decision state machine.
//!
//! The machine is pure: it only maps `(state, input)` to the next state. The
//! driving loop in [`super::Stepper`] performs the I/O each state calls for
//! and feeds the result back as an [`Input`].
//!
//! ```text
//! AwaitingAction --apply--> Applying --ok--> Closed(Completed)
//!                                    --err-> ConfirmingContinue --yes--> Closed(Failed)
//!                                                               --no---> Aborted(FailureDeclined)
//! AwaitingAction --skip--> Skipping --> Closed(Skipped)
//! AwaitingAction --detail--> Inspecting --> AwaitingAction
//! AwaitingAction --abort--> Aborting --yes--> Aborted(Operator)
//!                                    --no---> AwaitingAction
//! ```

use serde::Serialize;
use std::str::FromStr;

use crate::plan::ItemStatus;

/// A decision the operator can make for the current item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    /// Apply the current item.
    Apply,
    /// Skip the current item.
    Skip,
    /// Show the planned diff for the current item.
    Detail,
    /// Abort the whole run.
    Abort,
}

/// Why a run ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// The operator chose abort and confirmed it.
    Operator,
    /// An apply failed and the operator declined to continue.
    FailureDeclined,
    /// The operator's input ended.
    InputClosed,
}

/// State of the item currently being stepped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Waiting for the operator's decision.
    AwaitingAction,
    /// Executing the change.
    Applying,
    /// Apply failed; asking whether to carry on.
    ConfirmingContinue,
    /// Marking the item skipped.
    Skipping,
    /// Showing the item's diff.
    Inspecting,
    /// Asking the operator to confirm the abort.
    Aborting,
    /// The item is done; the run moves on.
    Closed(ItemStatus),
    /// The whole run stops here.
    Aborted(AbortReason),
}

/// What happened while in a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// The operator decided.
    Action(StepAction),
    /// Reading the decision failed but may succeed if retried.
    ReadFailed,
    /// No further decisions can be read.
    InputClosed,
    /// The apply succeeded.
    ApplySucceeded,
    /// The apply failed.
    ApplyFailed,
    /// The item was marked skipped.
    Skipped,
    /// The diff was shown (or its failure reported).
    DetailShown,
    /// Answer to a yes/no confirmation.
    Confirmed(bool),
}

impl ItemState {
    /// Returns the state reached from `self` on `input`.
    ///
    /// Inputs that don't apply to the current state leave it unchanged.
    #[must_use]
    pub const fn advance(self, input: Input) -> Self {
        match (self, input) {
            (Self::AwaitingAction, Input::Action(StepAction::Apply)) => Self::Applying,
            (Self::AwaitingAction, Input::Action(StepAction::Skip)) => Self::Skipping,
            (Self::AwaitingAction, Input::Action(StepAction::Detail)) => Self::Inspecting,
            (Self::AwaitingAction, Input::Action(StepAction::Abort)) => Self::Aborting,
            (Self::AwaitingAction, Input::InputClosed) => Self::Aborted(AbortReason::InputClosed),
            (Self::Applying, Input::ApplySucceeded) => Self::Closed(ItemStatus::Completed),
            (Self::Applying, Input::ApplyFailed) => Self::ConfirmingContinue,
            (Self::ConfirmingContinue, Input::Confirmed(true)) => Self::Closed(ItemStatus::Failed),
            (Self::ConfirmingContinue, Input::Confirmed(false)) => {
                Self::Aborted(AbortReason::FailureDeclined)
            }
            (Self::Skipping, Input::Skipped) => Self::Closed(ItemStatus::Skipped),
            (Self::Inspecting, Input::DetailShown)
            | (Self::Aborting, Input::Confirmed(false))
            | (Self::AwaitingAction, Input::ReadFailed) => Self::AwaitingAction,
            (Self::Aborting, Input::Confirmed(true)) => Self::Aborted(AbortReason::Operator),
            (state, _) => state,
        }
    }

    /// Returns true once no further input is expected for this item.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed(_) | Self::Aborted(_))
    }
}

impl AbortReason {
    /// Returns true if the item that ended the run belongs in the result set.
    #[must_use]
    pub const fn records_item(self) -> bool {
        matches!(self, Self::FailureDeclined)
    }
}

impl FromStr for StepAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "apply" => Ok(Self::Apply),
            "s" | "skip" => Ok(Self::Skip),
            "d" | "detail" => Ok(Self::Detail),
            "x" | "abort" => Ok(Self::Abort),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Apply => "apply",
            Self::Skip => "skip",
            Self::Detail => "detail",
            Self::Abort => "abort",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Operator => "aborted by operator",
            Self::FailureDeclined => "aborted due to errors",
            Self::InputClosed => "operator input closed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(inputs: &[Input]) -> ItemState {
        inputs
            .iter()
            .fold(ItemState::AwaitingAction, |state, input| state.advance(*input))
    }

    #[test]
    fn test_apply_success_closes_completed() {
        let end = run(&[Input::Action(StepAction::Apply), Input::ApplySucceeded]);
        assert_eq!(end, ItemState::Closed(ItemStatus::Completed));
        assert!(end.is_terminal());
    }

    #[test]
    fn test_apply_failure_asks_before_closing() {
        let state = run(&[Input::Action(StepAction::Apply), Input::ApplyFailed]);
        assert_eq!(state, ItemState::ConfirmingContinue);
        assert!(!state.is_terminal());

        assert_eq!(
            state.advance(Input::Confirmed(true)),
            ItemState::Closed(ItemStatus::Failed)
        );
        assert_eq!(
            state.advance(Input::Confirmed(false)),
            ItemState::Aborted(AbortReason::FailureDeclined)
        );
    }

    #[test]
    fn test_detail_loops_back() {
        let state = run(&[
            Input::Action(StepAction::Detail),
            Input::DetailShown,
            Input::Action(StepAction::Detail),
            Input::DetailShown,
        ]);
        assert_eq!(state, ItemState::AwaitingAction);
    }

    #[test]
    fn test_declined_abort_loops_back() {
        let state = run(&[Input::Action(StepAction::Abort), Input::Confirmed(false)]);
        assert_eq!(state, ItemState::AwaitingAction);

        let state = run(&[Input::Action(StepAction::Abort), Input::Confirmed(true)]);
        assert_eq!(state, ItemState::Aborted(AbortReason::Operator));
    }

    #[test]
    fn test_read_failure_is_retried_but_closed_input_aborts() {
        assert_eq!(run(&[Input::ReadFailed]), ItemState::AwaitingAction);
        assert_eq!(
            run(&[Input::InputClosed]),
            ItemState::Aborted(AbortReason::InputClosed)
        );
    }

    #[test]
    fn test_skip() {
        assert_eq!(
            run(&[Input::Action(StepAction::Skip), Input::Skipped]),
            ItemState::Closed(ItemStatus::Skipped)
        );
    }

    #[test]
    fn test_irrelevant_input_is_ignored() {
        assert_eq!(
            ItemState::Applying.advance(Input::Confirmed(true)),
            ItemState::Applying
        );
        let closed = ItemState::Closed(ItemStatus::Skipped);
        assert_eq!(closed.advance(Input::Action(StepAction::Apply)), closed);
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!("a".parse::<StepAction>(), Ok(StepAction::Apply));
        assert_eq!(" Skip \n".parse::<StepAction>(), Ok(StepAction::Skip));
        assert_eq!("d".parse::<StepAction>(), Ok(StepAction::Detail));
        assert_eq!("X".parse::<StepAction>(), Ok(StepAction::Abort));
        assert!("yes".parse::<StepAction>().is_err());
    }

    #[test]
    fn test_only_declined_failures_record_the_item() {
        assert!(AbortReason::FailureDeclined.records_item());
        assert!(!AbortReason::Operator.records_item());
        assert!(!AbortReason::InputClosed.records_item());
    }
}
