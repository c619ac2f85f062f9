//! Interactive stepping through an execution plan.
//!
//! The [`Stepper`] visits items one at a time, asks an [`Operator`] what to
//! do with each, and hands approved changes to an [`Executor`].

mod interface;
mod machine;
mod report;
mod runner;

pub use interface::{Executor, Operator, StepEvent};
pub use machine::{AbortReason, Input, ItemState, StepAction};
pub use report::{ApplyTiming, RunOutcome, StatusCounts, StepReport};
pub use runner::Stepper;
