//! CLI module for tfstep.
//!
//! This module provides the command-line interface: argument parsing,
//! output formatting, and the interactive terminal operator.

mod commands;
mod output;
mod prompt;

pub use commands::{Cli, Commands, OutputFormat, PlanArgs};
pub use output::OutputFormatter;
pub use prompt::TerminalOperator;
