// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # tfstep
//!
//! An interactive step debugger for Terraform plans.
//!
//! ## Overview
//!
//! Instead of applying a whole plan at once, tfstep walks through it one
//! resource at a time, in dependency order, letting the operator:
//!
//! - Apply the current resource with `terraform apply -target`
//! - Skip it
//! - Inspect its planned diff first
//! - Abort the run
//!
//! ## Architecture
//!
//! A run is a straight pipeline:
//!
//! 1. **Plan**: `terraform show -json` output is parsed into change items
//! 2. **Layers**: items are grouped into dependency-ordered layers; cycles
//!    are broken deterministically, one item at a time
//! 3. **Stepper**: each item goes through a small state machine driven by
//!    the operator's decisions
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`plan`]: Plan JSON parsing and the change item model
//! - [`planner`]: Dependency layering
//! - [`stepper`]: The interactive per-item state machine
//! - [`terraform`]: Terraform binary discovery and invocation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! # tfstep.yaml
//! terraform:
//!   dir: ./infra
//!   var_file: prod.tfvars
//! run:
//!   dry_run: false
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod plan;
pub mod planner;
pub mod stepper;
pub mod terraform;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter, TerminalOperator};
pub use config::{ConfigParser, ConfigValidator, StepConfig};
pub use error::{Result, StepError};
pub use plan::{ChangeItem, ChangeKind, ChangePlan, ItemStatus, PlanParser};
pub use planner::{ExecutionPlan, Layer, build_layers};
pub use stepper::{Executor, Operator, StepAction, StepReport, Stepper};
pub use terraform::{TerraformCli, TerraformExecutor};
