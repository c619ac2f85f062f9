//! [`Executor`] backed by the terraform command line.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::Result;
use crate::plan::ChangeItem;
use crate::stepper::Executor;

use super::client::TerraformCli;

/// Pause used in place of a real apply during dry runs.
pub const DRY_RUN_DELAY: Duration = Duration::from_millis(500);

/// Applies items one at a time with `terraform apply -target`.
#[derive(Debug, Clone)]
pub struct TerraformExecutor {
    /// Terraform client.
    cli: TerraformCli,
    /// Whether to simulate applies.
    dry_run: bool,
    /// Simulated apply duration.
    dry_run_delay: Duration,
}

impl TerraformExecutor {
    /// Creates a new executor.
    #[must_use]
    pub const fn new(cli: TerraformCli) -> Self {
        Self {
            cli,
            dry_run: false,
            dry_run_delay: DRY_RUN_DELAY,
        }
    }

    /// Sets whether applies are only simulated.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets how long a simulated apply takes.
    #[must_use]
    pub const fn with_dry_run_delay(mut self, delay: Duration) -> Self {
        self.dry_run_delay = delay;
        self
    }

    /// Returns true if applies are simulated.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[async_trait]
impl Executor for TerraformExecutor {
    async fn apply(&self, item: &ChangeItem) -> Result<()> {
        if self.dry_run {
            info!("[DRY RUN] Would apply {} ({})", item.id, item.kind);
            tokio::time::sleep(self.dry_run_delay).await;
            return Ok(());
        }

        self.cli.apply_target(&item.id).await
    }

    async fn detail(&self, item: &ChangeItem) -> Result<String> {
        let output = self.cli.plan_target(&item.id).await?;
        let section = extract_section(&output, &item.id);
        debug!(
            "Detail for {}: {} of {} bytes",
            item.id,
            section.len(),
            output.len()
        );
        Ok(section.to_string())
    }
}

/// Returns the `# <address> ...` block of plan output, or all of it.
///
/// A block runs up to the next `# ` marker. The address must be followed by
/// whitespace or an ANSI escape so `aws_instance.web` doesn't match
/// `aws_instance.web2`.
#[must_use]
pub fn extract_section<'a>(output: &'a str, address: &str) -> &'a str {
    let marker = format!("# {address}");
    let mut search_from = 0;

    while let Some(offset) = output[search_from..].find(&marker) {
        let start = search_from + offset;
        let after = start + marker.len();
        let bounded = output[after..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || c == '\x1b');

        if bounded {
            let end = output[after..]
                .find("# ")
                .map_or(output.len(), |next| after + next);
            return output[start..end].trim_end();
        }
        search_from = after;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ChangeKind;

    const PLAN_OUTPUT: &str = "\
Terraform will perform the following actions:

  # aws_instance.web2 will be created
  + resource \"aws_instance\" \"web2\" {
      + ami = \"ami-456\"
    }

  # aws_instance.web will be created
  + resource \"aws_instance\" \"web\" {
      + ami           = \"ami-123\"
      + instance_type = \"t3.micro\"
    }

  # aws_s3_bucket.logs will be updated in-place
  ~ resource \"aws_s3_bucket\" \"logs\" {
    }

Plan: 2 to add, 1 to change, 0 to destroy.
";

    #[test]
    fn test_extract_section_matches_whole_address() {
        let section = extract_section(PLAN_OUTPUT, "aws_instance.web");
        assert!(section.starts_with("# aws_instance.web will be created"));
        assert!(section.contains("t3.micro"));
        assert!(!section.contains("ami-456"));
        assert!(!section.contains("aws_s3_bucket"));
    }

    #[test]
    fn test_extract_last_section_runs_to_end() {
        let section = extract_section(PLAN_OUTPUT, "aws_s3_bucket.logs");
        assert!(section.starts_with("# aws_s3_bucket.logs"));
        assert!(section.ends_with("Plan: 2 to add, 1 to change, 0 to destroy."));
    }

    #[test]
    fn test_extract_section_falls_back_to_full_output() {
        let output = "No changes. Your infrastructure matches the configuration.";
        assert_eq!(extract_section(output, "aws_instance.web"), output);
        assert_eq!(extract_section(PLAN_OUTPUT, "aws_instance.missing"), PLAN_OUTPUT);
    }

    #[test]
    fn test_extract_section_from_colored_output() {
        let output = "\x1b[1m  # aws_instance.web2\x1b[0m will be created\n  + ami = \"ami-456\"\n\
\x1b[1m  # aws_instance.web\x1b[0m will be created\n  + instance_type = \"t3.micro\"\n\
\x1b[1mPlan:\x1b[0m 2 to add, 0 to change, 0 to destroy.\n";

        let section = extract_section(output, "aws_instance.web");
        assert_ne!(section, output);
        assert!(section.starts_with("# aws_instance.web\x1b[0m will be created"));
        assert!(section.contains("t3.micro"));
        assert!(!section.contains("ami-456"));
    }

    #[tokio::test]
    async fn test_dry_run_apply_never_invokes_terraform() {
        let cli = TerraformCli::new("/nonexistent/terraform", "/nonexistent");
        let executor = TerraformExecutor::new(cli)
            .with_dry_run(true)
            .with_dry_run_delay(Duration::ZERO);
        let item = ChangeItem::new("aws_instance.web", ChangeKind::Create);

        assert!(executor.is_dry_run());
        assert!(executor.apply(&item).await.is_ok());
    }

    #[tokio::test]
    async fn test_real_apply_surfaces_terraform_errors() {
        let cli = TerraformCli::new("/nonexistent/terraform", std::env::temp_dir());
        let executor = TerraformExecutor::new(cli);
        let item = ChangeItem::new("aws_instance.web", ChangeKind::Create);

        assert!(executor.apply(&item).await.is_err());
        assert!(executor.detail(&item).await.is_err());
    }
}
