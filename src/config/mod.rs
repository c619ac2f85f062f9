//! Configuration module for tfstep.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `tfstep.yaml`
//! - Environment and command-line overrides
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, apply_env_overrides, find_config_file};
pub use spec::{ConfigOverrides, RunConfig, StepConfig, TerraformConfig};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
