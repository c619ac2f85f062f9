//! The interactive driving loop.

use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::plan::{ChangeItem, ItemStatus};
use crate::planner::{ExecutionPlan, Layer};

use super::interface::{Executor, Operator, StepEvent};
use super::machine::{Input, ItemState};
use super::report::{ApplyTiming, RunOutcome, StepReport};

/// Walks an execution plan item by item under operator control.
///
/// Items are visited strictly in plan order, one at a time.
pub struct Stepper<'a> {
    /// Performs applies and diff lookups.
    executor: &'a dyn Executor,
    /// Decides the fate of each item.
    operator: &'a mut dyn Operator,
    /// Only visit the item with this address.
    filter: Option<String>,
}

impl<'a> Stepper<'a> {
    /// Creates a new stepper.
    #[must_use]
    pub fn new(executor: &'a dyn Executor, operator: &'a mut dyn Operator) -> Self {
        Self {
            executor,
            operator,
            filter: None,
        }
    }

    /// Restricts the run to the item with this address.
    #[must_use]
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    fn accepts(&self, item: &ChangeItem) -> bool {
        self.filter.as_deref().is_none_or(|id| id == item.id)
    }

    /// Steps through every layer of `plan`.
    ///
    /// Never fails: apply failures are recorded on the item, and every way
    /// of stopping early is reported through [`RunOutcome::Aborted`] with the
    /// items handled so far.
    pub async fn run(&mut self, plan: ExecutionPlan) -> StepReport {
        let started_at = Utc::now();
        let total = plan.items().filter(|item| self.accepts(item)).count();
        let layer_count = plan.len();
        info!("Stepping through {} items in {} layers", total, layer_count);

        let mut executed = Vec::new();
        let mut timings = Vec::new();
        let mut outcome = RunOutcome::Completed;
        let mut visited = 0;

        'layers: for (index, layer) in plan.into_layers().into_iter().enumerate() {
            let Layer { items, forced } = layer;
            let mut announced = false;

            for mut item in items {
                if !self.accepts(&item) {
                    debug!("Filtered out {}", item.id);
                    continue;
                }

                if !announced {
                    self.operator.notify(StepEvent::LayerStarted {
                        index: index + 1,
                        total: layer_count,
                        forced,
                    });
                    announced = true;
                }

                visited += 1;
                self.operator.notify(StepEvent::ItemStarted {
                    item: &item,
                    position: visited,
                    total,
                });

                let (state, elapsed) = self.step_item(&mut item).await;
                if let Some(elapsed) = elapsed {
                    timings.push(ApplyTiming {
                        id: item.id.clone(),
                        elapsed,
                    });
                }

                match state {
                    ItemState::Aborted(reason) => {
                        info!("Run {} at {}", reason, item.id);
                        if reason.records_item() {
                            executed.push(item);
                        }
                        self.operator.notify(StepEvent::Aborted { reason });
                        outcome = RunOutcome::Aborted { reason };
                        break 'layers;
                    }
                    _ => executed.push(item),
                }
            }
        }

        let report = StepReport {
            executed,
            outcome,
            timings,
            started_at,
            finished_at: Utc::now(),
        };
        info!("{report}");
        report
    }

    /// Drives one item to a terminal state.
    async fn step_item(&mut self, item: &mut ChangeItem) -> (ItemState, Option<Duration>) {
        let mut state = ItemState::AwaitingAction;
        let mut elapsed = None;

        while !state.is_terminal() {
            let input = match state {
                ItemState::AwaitingAction => self.read_action(item).await,
                ItemState::Inspecting => {
                    self.show_detail(item).await;
                    Input::DetailShown
                }
                ItemState::Skipping => {
                    item.status = ItemStatus::Skipped;
                    self.operator.notify(StepEvent::Skipped { item });
                    Input::Skipped
                }
                ItemState::Aborting => Input::Confirmed(self.confirm_abort(item).await),
                ItemState::Applying => {
                    let (input, took) = self.apply(item).await;
                    elapsed = Some(took);
                    input
                }
                ItemState::ConfirmingContinue => {
                    Input::Confirmed(self.confirm_continue(item).await)
                }
                ItemState::Closed(_) | ItemState::Aborted(_) => break,
            };
            state = state.advance(input);
        }

        (state, elapsed)
    }

    async fn read_action(&mut self, item: &ChangeItem) -> Input {
        match self.operator.prompt_action(item).await {
            Ok(action) => {
                debug!("{}: {}", item.id, action);
                Input::Action(action)
            }
            Err(e) if e.is_transient() => {
                warn!("Error getting user action: {e}");
                self.operator.notify(StepEvent::Error { item, error: &e });
                Input::ReadFailed
            }
            Err(e) => {
                warn!("Operator input unavailable: {e}");
                Input::InputClosed
            }
        }
    }

    async fn show_detail(&mut self, item: &ChangeItem) {
        match self.executor.detail(item).await {
            Ok(text) => self.operator.notify(StepEvent::Detail { item, text: &text }),
            Err(e) => {
                warn!("Failed to get details for {}: {e}", item.id);
                self.operator.notify(StepEvent::Error { item, error: &e });
            }
        }
    }

    async fn apply(&mut self, item: &mut ChangeItem) -> (Input, Duration) {
        item.status = ItemStatus::Approved;
        info!("Applying {}", item);
        self.operator.notify(StepEvent::Applying { item });

        let start = Instant::now();
        let result = self.executor.apply(item).await;
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                item.status = ItemStatus::Completed;
                info!("Applied {} in {:.2}s", item.id, elapsed.as_secs_f64());
                self.operator.notify(StepEvent::Applied {
                    item,
                    elapsed,
                    error: None,
                });
                (Input::ApplySucceeded, elapsed)
            }
            Err(e) => {
                item.status = ItemStatus::Failed;
                error!("Failed to apply {}: {e}", item.id);
                self.operator.notify(StepEvent::Applied {
                    item,
                    elapsed,
                    error: Some(&e),
                });
                (Input::ApplyFailed, elapsed)
            }
        }
    }

    async fn confirm_abort(&mut self, item: &ChangeItem) -> bool {
        match self.operator.confirm_abort(item).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                warn!("Error reading confirmation: {e}");
                self.operator.notify(StepEvent::Error { item, error: &e });
                false
            }
        }
    }

    async fn confirm_continue(&mut self, item: &ChangeItem) -> bool {
        match self.operator.confirm_continue(item).await {
            Ok(proceed) => proceed,
            Err(e) => {
                warn!("Error reading confirmation, stopping: {e}");
                self.operator.notify(StepEvent::Error { item, error: &e });
                false
            }
        }
    }
}

impl std::fmt::Debug for Stepper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stepper")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PromptError, Result, StepError, TerraformError};
    use crate::plan::ChangeKind;
    use crate::planner::build_layers;
    use crate::stepper::interface::MockExecutor;
    use crate::stepper::machine::{AbortReason, StepAction};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Operator answering from a script, recording every interaction.
    #[derive(Default)]
    struct ScriptedOperator {
        actions: VecDeque<Result<StepAction>>,
        confirmations: VecDeque<Result<bool>>,
        prompts: Vec<String>,
        confirms: usize,
        events: Vec<String>,
    }

    impl ScriptedOperator {
        fn with_actions(actions: Vec<StepAction>) -> Self {
            Self {
                actions: actions.into_iter().map(Ok).collect(),
                ..Self::default()
            }
        }

        fn confirming(mut self, answers: Vec<bool>) -> Self {
            self.confirmations = answers.into_iter().map(Ok).collect();
            self
        }

        fn next_confirmation(&mut self) -> Result<bool> {
            self.confirms += 1;
            self.confirmations
                .pop_front()
                .unwrap_or_else(|| Err(StepError::from(PromptError::InputClosed)))
        }
    }

    #[async_trait]
    impl Operator for ScriptedOperator {
        async fn prompt_action(&mut self, item: &ChangeItem) -> Result<StepAction> {
            self.prompts.push(item.id.clone());
            self.actions
                .pop_front()
                .unwrap_or_else(|| Err(StepError::from(PromptError::InputClosed)))
        }

        async fn confirm_abort(&mut self, _item: &ChangeItem) -> Result<bool> {
            self.next_confirmation()
        }

        async fn confirm_continue(&mut self, _item: &ChangeItem) -> Result<bool> {
            self.next_confirmation()
        }

        fn notify(&mut self, event: StepEvent<'_>) {
            let label = match event {
                StepEvent::LayerStarted { index, .. } => format!("layer {index}"),
                StepEvent::ItemStarted { item, .. } => format!("item {}", item.id),
                StepEvent::Detail { item, .. } => format!("detail {}", item.id),
                StepEvent::Applying { item } => format!("applying {}", item.id),
                StepEvent::Applied { item, .. } => format!("applied {} {}", item.id, item.status),
                StepEvent::Skipped { item } => format!("skipped {}", item.id),
                StepEvent::Error { item, .. } => format!("error {}", item.id),
                StepEvent::Aborted { reason } => format!("aborted {reason}"),
            };
            self.events.push(label);
        }
    }

    fn chain(ids: &[&str]) -> ExecutionPlan {
        let mut previous: Option<&str> = None;
        let items = ids.iter().map(|id| {
            let item = ChangeItem::new(*id, ChangeKind::Create)
                .with_dependencies(previous.iter().copied());
            previous = Some(*id);
            item
        });
        build_layers(items.collect::<Vec<_>>())
    }

    fn failing_apply() -> StepError {
        StepError::from(TerraformError::CommandFailed {
            command: String::from("terraform apply"),
            status: String::from("exit status: 1"),
            stderr: String::new(),
        })
    }

    #[tokio::test]
    async fn test_apply_all() {
        let mut executor = MockExecutor::new();
        executor.expect_apply().times(2).returning(|_| Ok(()));
        executor.expect_detail().never();
        let mut operator = ScriptedOperator::with_actions(vec![StepAction::Apply, StepAction::Apply]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a", "x.b"]))
            .await;

        assert!(report.is_completed());
        assert_eq!(report.counts().completed, 2);
        assert_eq!(report.timings.len(), 2);
        assert!(report.elapsed_for("x.b").is_some());
        assert_eq!(operator.prompts, vec!["x.a", "x.b"]);
    }

    #[tokio::test]
    async fn test_filter_matching_nothing_never_touches_operator() {
        let mut executor = MockExecutor::new();
        executor.expect_apply().never();
        executor.expect_detail().never();
        let mut operator = ScriptedOperator::default();

        let report = Stepper::new(&executor, &mut operator)
            .with_filter(Some(String::from("x.missing")))
            .run(chain(&["x.a", "x.b", "x.c"]))
            .await;

        assert!(report.executed.is_empty());
        assert!(report.is_completed());
        assert!(operator.prompts.is_empty());
        assert_eq!(operator.confirms, 0);
        assert!(operator.events.is_empty());
    }

    #[tokio::test]
    async fn test_filter_visits_only_the_target() {
        let mut executor = MockExecutor::new();
        executor
            .expect_apply()
            .withf(|item| item.id == "x.b")
            .times(1)
            .returning(|_| Ok(()));
        let mut operator = ScriptedOperator::with_actions(vec![StepAction::Apply]);

        let report = Stepper::new(&executor, &mut operator)
            .with_filter(Some(String::from("x.b")))
            .run(chain(&["x.a", "x.b", "x.c"]))
            .await;

        assert_eq!(report.executed.len(), 1);
        assert_eq!(report.executed[0].id, "x.b");
        assert_eq!(operator.events[0], "layer 2");
    }

    #[tokio::test]
    async fn test_declined_continue_after_failure_aborts() {
        let mut executor = MockExecutor::new();
        executor
            .expect_apply()
            .withf(|item| item.id == "x.a")
            .times(1)
            .returning(|_| Ok(()));
        executor
            .expect_apply()
            .withf(|item| item.id == "x.b")
            .times(1)
            .returning(|_| Err(failing_apply()));
        let mut operator = ScriptedOperator::with_actions(vec![StepAction::Apply, StepAction::Apply])
            .confirming(vec![false]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a", "x.b", "x.c"]))
            .await;

        assert_eq!(report.executed.len(), 2);
        assert_eq!(report.executed[1].status, ItemStatus::Failed);
        assert_eq!(report.abort_reason(), Some(AbortReason::FailureDeclined));
        assert!(!report.is_completed());
        assert_eq!(operator.confirms, 1);
        assert!(!operator.prompts.contains(&String::from("x.c")));
    }

    #[tokio::test]
    async fn test_continue_after_failure_keeps_failed_item() {
        let mut executor = MockExecutor::new();
        executor
            .expect_apply()
            .withf(|item| item.id == "x.a")
            .returning(|_| Err(failing_apply()));
        executor
            .expect_apply()
            .withf(|item| item.id == "x.b")
            .returning(|_| Ok(()));
        let mut operator = ScriptedOperator::with_actions(vec![StepAction::Apply, StepAction::Apply])
            .confirming(vec![true]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a", "x.b"]))
            .await;

        assert!(report.is_completed());
        let counts = report.counts();
        assert_eq!((counts.completed, counts.failed), (1, 1));
        assert!(operator.events.contains(&String::from("applied x.a failed")));
    }

    #[tokio::test]
    async fn test_detail_does_not_advance() {
        let mut executor = MockExecutor::new();
        executor
            .expect_detail()
            .times(2)
            .returning(|_| Ok(String::from("+ ami = \"ami-123\"")));
        executor.expect_apply().never();
        let mut operator = ScriptedOperator::with_actions(vec![
            StepAction::Detail,
            StepAction::Detail,
            StepAction::Skip,
        ]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a"]))
            .await;

        assert_eq!(operator.prompts.len(), 3);
        assert_eq!(report.executed.len(), 1);
        assert_eq!(report.executed[0].status, ItemStatus::Skipped);
        assert!(report.timings.is_empty());
    }

    #[tokio::test]
    async fn test_detail_failure_is_reported_and_reprompts() {
        let mut executor = MockExecutor::new();
        executor
            .expect_detail()
            .times(1)
            .returning(|_| Err(StepError::internal("plan failed")));
        let mut operator =
            ScriptedOperator::with_actions(vec![StepAction::Detail, StepAction::Skip]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a"]))
            .await;

        assert!(report.is_completed());
        assert_eq!(operator.prompts.len(), 2);
        assert!(operator.events.contains(&String::from("error x.a")));
    }

    #[tokio::test]
    async fn test_abort_confirmed_stops_before_recording() {
        let executor = MockExecutor::new();
        let mut operator =
            ScriptedOperator::with_actions(vec![StepAction::Skip, StepAction::Abort])
                .confirming(vec![true]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a", "x.b", "x.c"]))
            .await;

        assert_eq!(report.abort_reason(), Some(AbortReason::Operator));
        assert_eq!(report.executed.len(), 1);
        assert_eq!(operator.prompts, vec!["x.a", "x.b"]);
        assert_eq!(operator.events.last().map(String::as_str), Some("aborted aborted by operator"));
    }

    #[tokio::test]
    async fn test_abort_declined_reprompts_same_item() {
        let executor = MockExecutor::new();
        let mut operator =
            ScriptedOperator::with_actions(vec![StepAction::Abort, StepAction::Skip])
                .confirming(vec![false]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a"]))
            .await;

        assert!(report.is_completed());
        assert_eq!(operator.prompts, vec!["x.a", "x.a"]);
        assert_eq!(report.executed[0].status, ItemStatus::Skipped);
    }

    #[tokio::test]
    async fn test_unreadable_abort_confirmation_counts_as_no() {
        let executor = MockExecutor::new();
        let mut operator = ScriptedOperator::with_actions(vec![StepAction::Abort, StepAction::Skip]);
        operator.confirmations = VecDeque::from([Err(StepError::from(PromptError::read("bad")))]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a"]))
            .await;

        assert!(report.is_completed());
        assert_eq!(report.executed[0].status, ItemStatus::Skipped);
    }

    #[tokio::test]
    async fn test_transient_read_error_repeats_prompt() {
        let executor = MockExecutor::new();
        let mut operator = ScriptedOperator::default();
        operator.actions = VecDeque::from([
            Err(StepError::from(PromptError::read("invalid utf-8"))),
            Ok(StepAction::Skip),
        ]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a"]))
            .await;

        assert!(report.is_completed());
        assert_eq!(operator.prompts.len(), 2);
        assert_eq!(report.counts().skipped, 1);
    }

    #[tokio::test]
    async fn test_closed_input_aborts_instead_of_looping() {
        let executor = MockExecutor::new();
        let mut operator = ScriptedOperator::with_actions(vec![StepAction::Skip]);

        let report = Stepper::new(&executor, &mut operator)
            .run(chain(&["x.a", "x.b"]))
            .await;

        assert_eq!(report.abort_reason(), Some(AbortReason::InputClosed));
        assert_eq!(report.executed.len(), 1);
        assert_eq!(operator.prompts.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_plan_completes_silently() {
        let executor = MockExecutor::new();
        let mut operator = ScriptedOperator::default();

        let report = Stepper::new(&executor, &mut operator)
            .run(ExecutionPlan::default())
            .await;

        assert!(report.is_completed());
        assert!(report.executed.is_empty());
        assert!(operator.events.is_empty());
    }
}
