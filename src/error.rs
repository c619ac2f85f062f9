//! Error types for the tfstep step debugger.
//!
//! This module provides the error hierarchy for every stage of a run:
//! configuration, plan loading, Terraform invocation, and operator input.
//! Malformed dependency data has no variant: the layering stage treats
//! unknown references as satisfied and never fails.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tfstep.
#[derive(Debug, Error)]
pub enum StepError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan loading errors.
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Terraform invocation errors.
    #[error("Terraform error: {0}")]
    Terraform(#[from] TerraformError),

    /// Operator input errors.
    #[error("Input error: {0}")]
    Prompt(#[from] PromptError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// No directory containing Terraform files was found.
    #[error("No Terraform files found in {start} or any parent directory")]
    NoTerraformDir {
        /// Directory the search started from.
        start: PathBuf,
    },

    /// The requested target is not part of the plan.
    #[error("Target resource '{target}' not found in plan")]
    UnknownTarget {
        /// The requested target address.
        target: String,
    },
}

/// Plan loading errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The `terraform show -json` document could not be decoded.
    #[error("Failed to parse plan JSON: {message}")]
    InvalidPlanJson {
        /// Description of the decode failure.
        message: String,
    },

    /// The plan file does not exist.
    #[error("Plan file not found: {path}")]
    PlanFileNotFound {
        /// Path to the missing plan file.
        path: PathBuf,
    },
}

/// Terraform invocation errors.
#[derive(Debug, Error)]
pub enum TerraformError {
    /// The terraform binary could not be located.
    #[error("terraform binary not found in PATH or common locations")]
    BinaryNotFound,

    /// The terraform binary could not be started.
    #[error("Failed to run {command}: {message}")]
    SpawnFailed {
        /// The command that was being run.
        command: String,
        /// Description of the failure.
        message: String,
    },

    /// A terraform command exited unsuccessfully.
    #[error("{command} exited with {status}")]
    CommandFailed {
        /// The command that failed.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured stderr, if any.
        stderr: String,
    },

    /// The version output could not be understood.
    #[error("Unable to parse Terraform version from: {output}")]
    UnparseableVersion {
        /// Raw version output.
        output: String,
    },

    /// The installed Terraform is too old.
    #[error("Unsupported Terraform version {version}, version 0.12.0 or higher is required")]
    UnsupportedVersion {
        /// Detected version.
        version: String,
    },
}

/// Operator input errors.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Reading from the operator failed.
    #[error("Failed to read input: {message}")]
    ReadFailed {
        /// Description of the read failure.
        message: String,
    },

    /// The operator's input stream has ended.
    #[error("Input closed")]
    InputClosed,
}

/// Result type alias for tfstep operations.
pub type Result<T> = std::result::Result<T, StepError>;

impl StepError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error should be reported and the prompt repeated.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Prompt(PromptError::ReadFailed { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl PlanError {
    /// Creates a JSON decode error.
    #[must_use]
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidPlanJson {
            message: message.into(),
        }
    }
}

impl TerraformError {
    /// Creates a spawn error for the given command.
    #[must_use]
    pub fn spawn(command: impl Into<String>, err: &std::io::Error) -> Self {
        Self::SpawnFailed {
            command: command.into(),
            message: err.to_string(),
        }
    }
}

impl PromptError {
    /// Creates a read error.
    #[must_use]
    pub fn read(message: impl Into<String>) -> Self {
        Self::ReadFailed {
            message: message.into(),
        }
    }
}
