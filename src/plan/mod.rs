//! Plan source: the change items a run operates on.
//!
//! Items are loaded once per run from `terraform show -json` output and are
//! never refreshed afterwards.

mod model;
mod parser;

pub use model::{ChangeItem, ChangeKind, ChangePlan, ItemStatus, PlanStats};
pub use parser::PlanParser;
