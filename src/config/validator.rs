//! Configuration validation.
//!
//! Checks that every path the configuration names exists before Terraform is
//! invoked, and that a requested target is actually part of the loaded plan.

use crate::error::{ConfigError, Result, StepError};
use crate::plan::ChangePlan;
use tracing::debug;

use super::spec::StepConfig;

/// Validator for tfstep configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &StepConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_paths(config, &mut result);
        Self::validate_run(config, &mut result);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(StepError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    /// Validates that configured paths exist.
    fn validate_paths(config: &StepConfig, result: &mut ValidationResult) {
        if let Some(dir) = &config.terraform.dir
            && !dir.is_dir()
        {
            result.errors.push(ValidationError {
                field: String::from("terraform.dir"),
                message: format!("Terraform directory '{}' does not exist", dir.display()),
            });
        }

        if let Some(var_file) = &config.terraform.var_file
            && !var_file.is_file()
        {
            result.errors.push(ValidationError {
                field: String::from("terraform.var_file"),
                message: format!("Variable file '{}' does not exist", var_file.display()),
            });
        }

        if let Some(binary) = &config.terraform.binary
            && !binary.is_file()
        {
            result.errors.push(ValidationError {
                field: String::from("terraform.binary"),
                message: format!("Terraform binary '{}' does not exist", binary.display()),
            });
        }
    }

    /// Validates run settings.
    fn validate_run(config: &StepConfig, result: &mut ValidationResult) {
        if let Some(plan_file) = &config.run.plan_file
            && !plan_file.is_file()
        {
            result.errors.push(ValidationError {
                field: String::from("run.plan_file"),
                message: format!("Plan file '{}' does not exist", plan_file.display()),
            });
        }

        if let Some(target) = &config.run.target
            && target.trim().is_empty()
        {
            result.errors.push(ValidationError {
                field: String::from("run.target"),
                message: String::from("Target cannot be empty"),
            });
        }

        if config.run.plan_file.is_some() && config.terraform.var_file.is_some() {
            result.warnings.push(String::from(
                "var_file is not used to read an existing plan file; it only applies to apply and detail",
            ));
        }

        if config.run.dry_run {
            result
                .warnings
                .push(String::from("Dry run enabled: no changes will be applied"));
        }
    }

    /// Checks that a target address, if any, names an item with changes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTarget`] if the plan has no such item,
    /// or only a no-op one.
    pub fn validate_target(&self, target: Option<&str>, plan: &ChangePlan) -> Result<()> {
        match target {
            Some(target) if !plan.schedules(target) => {
                Err(StepError::Config(ConfigError::UnknownTarget {
                    target: target.to_string(),
                }))
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ChangeItem, ChangeKind};
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::new().validate(&StepConfig::default()).unwrap();
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_dir_rejected() {
        let mut config = StepConfig::default();
        config.terraform.dir = Some(PathBuf::from("/nonexistent/terraform/dir"));

        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(matches!(
            err,
            StepError::Config(ConfigError::ValidationError { field: Some(ref f), .. }) if f == "terraform.dir"
        ));
    }

    #[test]
    fn test_empty_target_rejected() {
        let mut config = StepConfig::default();
        config.run.target = Some(String::from("  "));

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_dry_run_warns() {
        let mut config = StepConfig::default();
        config.run.dry_run = true;

        let result = ConfigValidator::new().validate(&config).unwrap();
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_validate_target() {
        let plan = ChangePlan::from_items(vec![ChangeItem::new(
            "aws_instance.web",
            ChangeKind::Create,
        )]);
        let validator = ConfigValidator::new();

        assert!(validator.validate_target(None, &plan).is_ok());
        assert!(validator.validate_target(Some("aws_instance.web"), &plan).is_ok());
        assert!(matches!(
            validator.validate_target(Some("aws_instance.db"), &plan),
            Err(StepError::Config(ConfigError::UnknownTarget { .. }))
        ));
    }

    #[test]
    fn test_validate_target_rejects_no_op_item() {
        let plan = ChangePlan::from_items(vec![
            ChangeItem::new("aws_instance.web", ChangeKind::Create),
            ChangeItem::new("aws_vpc.main", ChangeKind::NoChange),
        ]);

        let result = ConfigValidator::new().validate_target(Some("aws_vpc.main"), &plan);
        assert!(matches!(
            result,
            Err(StepError::Config(ConfigError::UnknownTarget { target })) if target == "aws_vpc.main"
        ));
    }
}
