//! Configuration specification types for tfstep.
//!
//! These types map to the optional `tfstep.yaml` file. Every field has a
//! default so an absent or partial file is always valid input.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The root configuration structure for a tfstep run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepConfig {
    /// Terraform invocation settings.
    #[serde(default)]
    pub terraform: TerraformConfig,
    /// Run behaviour settings.
    #[serde(default)]
    pub run: RunConfig,
}

/// How and where Terraform is invoked.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerraformConfig {
    /// Path to the terraform binary (searched for when unset).
    #[serde(default)]
    pub binary: Option<PathBuf>,
    /// Terraform working directory (discovered when unset).
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Variable file passed as `-var-file`.
    #[serde(default)]
    pub var_file: Option<PathBuf>,
}

/// Settings for a single stepping run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    /// Existing plan file; a temporary plan is generated when unset.
    #[serde(default)]
    pub plan_file: Option<PathBuf>,
    /// Only step through the resource with this address.
    #[serde(default)]
    pub target: Option<String>,
    /// Simulate applies instead of running Terraform.
    #[serde(default)]
    pub dry_run: bool,
}

/// Command-line values that take precedence over the file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--terraform`.
    pub binary: Option<PathBuf>,
    /// `--dir`.
    pub dir: Option<PathBuf>,
    /// `--var-file`.
    pub var_file: Option<PathBuf>,
    /// `--plan`.
    pub plan_file: Option<PathBuf>,
    /// `--target`.
    pub target: Option<String>,
    /// `--dry-run`; only ever switches dry run on.
    pub dry_run: bool,
}

impl StepConfig {
    /// Applies command-line overrides on top of this configuration.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if overrides.binary.is_some() {
            self.terraform.binary = overrides.binary;
        }
        if overrides.dir.is_some() {
            self.terraform.dir = overrides.dir;
        }
        if overrides.var_file.is_some() {
            self.terraform.var_file = overrides.var_file;
        }
        if overrides.plan_file.is_some() {
            self.run.plan_file = overrides.plan_file;
        }
        if overrides.target.is_some() {
            self.run.target = overrides.target;
        }
        self.run.dry_run |= overrides.dry_run;
        self
    }
}
