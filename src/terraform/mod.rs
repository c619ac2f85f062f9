//! Terraform integration.
//!
//! This module provides:
//! - Binary discovery and version checks
//! - Working-directory discovery and temporary plan files
//! - The terraform-backed [`crate::stepper::Executor`]

mod binary;
mod client;
mod executor;

pub use binary::{FALLBACK_LOCATIONS, MINIMUM_VERSION, TerraformVersion, locate};
pub use client::{LoadedPlan, TerraformCli, find_terraform_dir, temp_plan_file};
pub use executor::{DRY_RUN_DELAY, TerraformExecutor, extract_section};
