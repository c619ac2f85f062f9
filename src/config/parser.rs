//! Configuration parser for loading and merging configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, StepError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::StepConfig;

/// Configuration parser for loading tfstep configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<StepConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(StepError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StepError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<StepConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(StepConfig::default());
        }

        serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            StepError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Without a path the default configuration is used as the base.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: Option<&Path>) -> Result<StepConfig> {
        let mut config = match path {
            Some(path) => self.load_file(path)?,
            None => StepConfig::default(),
        };

        apply_env_overrides(&mut config, |name| std::env::var(name).ok());

        Ok(config)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                StepError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Applies `TFSTEP_*` environment overrides using the given lookup.
pub fn apply_env_overrides(config: &mut StepConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(binary) = lookup("TFSTEP_TERRAFORM_BINARY") {
        debug!("Overriding terraform.binary from environment");
        config.terraform.binary = Some(PathBuf::from(binary));
    }

    if let Some(dir) = lookup("TFSTEP_DIR") {
        debug!("Overriding terraform.dir from environment");
        config.terraform.dir = Some(PathBuf::from(dir));
    }

    if let Some(var_file) = lookup("TFSTEP_VAR_FILE") {
        debug!("Overriding terraform.var_file from environment");
        config.terraform.var_file = Some(PathBuf::from(var_file));
    }

    if let Some(dry_run) = lookup("TFSTEP_DRY_RUN") {
        debug!("Overriding run.dry_run from environment");
        config.run.dry_run = matches!(
            dry_run.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        );
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["tfstep.yaml", "tfstep.yml", ".tfstep.yaml"];

/// Finds the configuration file in the start directory or its parents,
/// falling back to `<user config dir>/tfstep/config.yaml`.
///
/// Returns `None` when no file exists; configuration is optional.
#[must_use]
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut current = search_root(start_dir.as_ref());

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    dirs::config_dir()
        .map(|dir| dir.join("tfstep").join("config.yaml"))
        .filter(|path| path.exists())
}

/// Anchors a relative start directory so the upward walk can leave it.
fn search_root(start_dir: &Path) -> PathBuf {
    std::path::absolute(start_dir).unwrap_or_else(|_| start_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_empty_config() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml("", None).unwrap();
        assert_eq!(config, StepConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
terraform:
  binary: /opt/homebrew/bin/terraform
  dir: infra/prod
  var_file: prod.tfvars
run:
  target: aws_instance.web
  dry_run: true
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).unwrap();

        assert_eq!(
            config.terraform.binary,
            Some(PathBuf::from("/opt/homebrew/bin/terraform"))
        );
        assert_eq!(config.terraform.var_file, Some(PathBuf::from("prod.tfvars")));
        assert_eq!(config.run.target.as_deref(), Some("aws_instance.web"));
        assert!(config.run.dry_run);
        assert!(config.run.plan_file.is_none());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let parser = ConfigParser::new();
        let result = parser.parse_yaml("run: [unclosed", None);
        assert!(matches!(
            result,
            Err(StepError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([("TFSTEP_DIR", "/srv/infra"), ("TFSTEP_DRY_RUN", "true")]);

        let mut config = StepConfig::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.terraform.dir, Some(PathBuf::from("/srv/infra")));
        assert!(config.run.dry_run);
        assert!(config.terraform.binary.is_none());
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let temp = tempfile::TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(temp.path().join("tfstep.yaml"), "run:\n  dry_run: true\n").unwrap();

        let found = find_config_file(&nested);
        assert_eq!(found, Some(temp.path().join("tfstep.yaml")));
    }

    #[test]
    fn test_relative_start_walks_from_process_dir() {
        let cwd = std::env::current_dir().unwrap();
        let root = search_root(Path::new("."));

        assert!(root.is_absolute());
        assert_eq!(root.components().collect::<Vec<_>>(), cwd.components().collect::<Vec<_>>());
        assert!(root.parent().is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let parser = ConfigParser::new();
        let result = parser.load_file("/nonexistent/tfstep.yaml");
        assert!(matches!(
            result,
            Err(StepError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
