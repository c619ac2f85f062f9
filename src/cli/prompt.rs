//! Terminal operator: prompts on stderr, answers from stdin.

use async_trait::async_trait;
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::error::{PromptError, Result};
use crate::plan::ChangeItem;
use crate::stepper::{Operator, StepAction, StepEvent};

use super::output::OutputFormatter;

/// Interactive [`Operator`] reading one answer per line.
///
/// Unrecognized actions are re-asked without involving the stepper. End of
/// input is reported as [`PromptError::InputClosed`].
pub struct TerminalOperator<R = BufReader<Stdin>> {
    lines: Lines<R>,
}

impl TerminalOperator {
    /// Creates an operator reading from standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> TerminalOperator<R> {
    /// Creates an operator reading from `reader`.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    async fn read_line(&mut self) -> Result<String> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(PromptError::InputClosed.into()),
            Err(e) => Err(PromptError::read(e.to_string()).into()),
        }
    }

    async fn ask_yes_no(&mut self, question: &str) -> Result<bool> {
        eprint!("{question} [y/n]: ");
        let answer = self.read_line().await?;
        Ok(is_yes(&answer))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Operator for TerminalOperator<R> {
    async fn prompt_action(&mut self, _item: &ChangeItem) -> Result<StepAction> {
        loop {
            eprint!("{} [a=apply, s=skip, d=detail, x=abort]: ", "Action".bold());
            let line = self.read_line().await?;
            match line.parse() {
                Ok(action) => return Ok(action),
                Err(_) => eprintln!("Invalid action. Please try again."),
            }
        }
    }

    async fn confirm_abort(&mut self, _item: &ChangeItem) -> Result<bool> {
        self.ask_yes_no("Are you sure you want to abort?").await
    }

    async fn confirm_continue(&mut self, _item: &ChangeItem) -> Result<bool> {
        self.ask_yes_no(&format!("{} despite errors?", "Continue".bold()))
            .await
    }

    fn notify(&mut self, event: StepEvent<'_>) {
        match event {
            StepEvent::LayerStarted {
                index,
                total,
                forced,
            } => eprintln!("\n{}", OutputFormatter::format_layer_header(index, total, forced)),
            StepEvent::ItemStarted {
                item,
                position,
                total,
            } => eprintln!("{}", OutputFormatter::format_item(item, position, total)),
            StepEvent::Detail { text, .. } => eprintln!("{}", OutputFormatter::format_detail(text)),
            StepEvent::Applying { item } => {
                eprintln!("Applying resource: {} ({})", item.id, item.kind.label());
            }
            StepEvent::Applied {
                item,
                elapsed,
                error,
            } => {
                eprintln!("{}\n", OutputFormatter::format_apply_result(item, elapsed));
                if let Some(error) = error {
                    eprintln!("{} {error}", "Error:".red());
                }
            }
            StepEvent::Skipped { item } => eprintln!("Skipping resource: {}\n", item.id),
            StepEvent::Error { error, .. } => eprintln!("{} {error}", "Error:".red()),
            StepEvent::Aborted { reason } => eprintln!("Execution {reason}."),
        }
    }
}

impl<R> std::fmt::Debug for TerminalOperator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalOperator").finish_non_exhaustive()
    }
}
