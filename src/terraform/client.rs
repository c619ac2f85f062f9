//! Thin async wrapper around the terraform command line.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tempfile::TempPath;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{ConfigError, PlanError, Result, TerraformError};
use crate::plan::{ChangePlan, PlanParser};

use super::binary::TerraformVersion;

/// Runs terraform commands in one working directory.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: PathBuf,
    dir: PathBuf,
    var_file: Option<PathBuf>,
}

/// A parsed plan, plus the temporary plan file backing it, if any.
///
/// The temporary file is deleted when this value is dropped.
#[derive(Debug)]
pub struct LoadedPlan {
    /// The parsed plan.
    pub plan: ChangePlan,
    temp: Option<TempPath>,
}

impl LoadedPlan {
    /// Returns true if the plan file was generated for this run.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        self.temp.is_some()
    }
}

impl TerraformCli {
    /// Creates a client for `binary` operating in `dir`.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            dir: dir.into(),
            var_file: None,
        }
    }

    /// Passes `-var-file` to plan and apply commands.
    #[must_use]
    pub fn with_var_file(mut self, var_file: Option<PathBuf>) -> Self {
        self.var_file = var_file;
        self
    }

    /// Returns the working directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the terraform binary path.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Reads and gates the installed version.
    ///
    /// # Errors
    ///
    /// Returns an error if terraform cannot be run, its output is not
    /// understood, or the release is older than 0.12.
    pub async fn version(&self) -> Result<TerraformVersion> {
        let output = self.capture(&["version"]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        TerraformVersion::parse(&stdout)?.ensure_supported()
    }

    /// Runs `terraform plan -out <plan_file>` with output shown to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan command fails.
    pub async fn generate_plan(&self, plan_file: &Path) -> Result<()> {
        let mut args = vec![String::from("plan"), String::from("-out")];
        args.push(plan_file.to_string_lossy().into_owned());
        args.extend(self.var_file_args());
        self.run_inherited(&args).await
    }

    /// Returns `terraform show -json <plan_file>` output.
    ///
    /// # Errors
    ///
    /// Returns an error if the show command fails.
    pub async fn show_json(&self, plan_file: &Path) -> Result<Vec<u8>> {
        let path = plan_file.to_string_lossy();
        let output = self.capture(&["show", "-json", &*path]).await?;
        Ok(output.stdout)
    }

    /// Loads the plan from `plan_file`, or generates a temporary one.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan file is missing, cannot be generated,
    /// or cannot be parsed.
    pub async fn load_plan(&self, plan_file: Option<&Path>) -> Result<LoadedPlan> {
        let (path, temp) = match plan_file {
            Some(path) => (resolve_plan_file(path)?, None),
            None => {
                let temp = temp_plan_file()?;
                info!("Generating Terraform plan to {}", temp.display());
                self.generate_plan(&temp).await?;
                (temp.to_path_buf(), Some(temp))
            }
        };

        let json = self.show_json(&path).await?;
        let mut plan = PlanParser::new().parse_json(&json)?;
        plan.plan_file = Some(path);
        plan.working_dir = Some(self.dir.clone());

        Ok(LoadedPlan { plan, temp })
    }

    /// Runs `terraform apply -auto-approve -target <address>` with output
    /// shown to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the apply command fails.
    pub async fn apply_target(&self, address: &str) -> Result<()> {
        let mut args = vec![
            String::from("apply"),
            String::from("-auto-approve"),
            String::from("-target"),
            address.to_string(),
        ];
        args.extend(self.var_file_args());
        self.run_inherited(&args).await
    }

    /// Returns the combined, uncolored output of
    /// `terraform plan -target <address>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan command fails.
    pub async fn plan_target(&self, address: &str) -> Result<String> {
        let output = self.capture(&self.plan_target_args(address)).await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    fn plan_target_args(&self, address: &str) -> Vec<String> {
        let mut args = vec![
            String::from("plan"),
            String::from("-no-color"),
            String::from("-target"),
            address.to_string(),
        ];
        args.extend(self.var_file_args());
        args
    }

    fn var_file_args(&self) -> Vec<String> {
        self.var_file
            .iter()
            .flat_map(|file| [String::from("-var-file"), file.to_string_lossy().into_owned()])
            .collect()
    }

    fn command<S: AsRef<str>>(&self, args: &[S]) -> (Command, String) {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(&self.dir);
        cmd.args(args.iter().map(|a| a.as_ref()));
        let command_line = std::iter::once(String::from("terraform"))
            .chain(args.iter().map(|a| a.as_ref().to_string()))
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Running {} in {}", command_line, self.dir.display());
        (cmd, command_line)
    }

    async fn capture<S: AsRef<str>>(&self, args: &[S]) -> Result<Output> {
        let (mut cmd, command_line) = self.command(args);
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TerraformError::spawn(&command_line, &e))?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(TerraformError::CommandFailed {
                command: command_line,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into())
        }
    }

    async fn run_inherited<S: AsRef<str>>(&self, args: &[S]) -> Result<()> {
        let (mut cmd, command_line) = self.command(args);
        let status = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| TerraformError::spawn(&command_line, &e))?;

        if status.success() {
            Ok(())
        } else {
            Err(TerraformError::CommandFailed {
                command: command_line,
                status: status.to_string(),
                stderr: String::new(),
            }
            .into())
        }
    }
}

/// Makes a user-supplied plan path absolute and checks that it exists.
///
/// Terraform runs inside the working directory, so relative paths are
/// anchored to the process directory first.
fn resolve_plan_file(path: &Path) -> Result<PathBuf> {
    let path = std::path::absolute(path)?;
    if path.exists() {
        Ok(path)
    } else {
        Err(PlanError::PlanFileNotFound { path }.into())
    }
}

/// Creates an empty `tfstep-*.tfplan` file in the system temp directory.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn temp_plan_file() -> Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix("tfstep-")
        .suffix(".tfplan")
        .tempfile()?;
    Ok(file.into_temp_path())
}

/// Finds the nearest directory, starting at `start`, that holds `*.tf` files.
///
/// # Errors
///
/// Returns [`ConfigError::NoTerraformDir`] if no such directory exists.
pub fn find_terraform_dir(start: &Path) -> Result<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if has_terraform_files(dir) {
            debug!("Found Terraform files in {}", dir.display());
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }

    Err(ConfigError::NoTerraformDir {
        start: start.to_path_buf(),
    }
    .into())
}

fn has_terraform_files(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries.filter_map(std::result::Result::ok).any(|entry| {
            let path = entry.path();
            path.is_file() && path.extension().is_some_and(|ext| ext == "tf")
        })
    })
}
