//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

/// tfstep - Step through a Terraform plan one resource at a time.
#[derive(Parser, Debug)]
#[command(name = "tfstep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "TFSTEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactively apply the plan, one resource at a time.
    Run {
        /// Plan options.
        #[command(flatten)]
        plan: PlanArgs,

        /// Simulate applies without changing infrastructure.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the layered execution order without applying anything.
    Graph {
        /// Plan options.
        #[command(flatten)]
        plan: PlanArgs,
    },
}

/// Options shared by commands that load a plan.
#[derive(Args, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Terraform working directory (defaults to the nearest directory with `.tf` files).
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Existing plan file (a temporary plan is generated if omitted).
    #[arg(short, long)]
    pub plan: Option<PathBuf>,

    /// Path to the terraform binary.
    #[arg(long)]
    pub terraform: Option<PathBuf>,

    /// Variable file passed to terraform.
    #[arg(long)]
    pub var_file: Option<PathBuf>,

    /// Only step through this resource address.
    #[arg(short, long)]
    pub target: Option<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl PlanArgs {
    /// Converts these flags into configuration overrides.
    #[must_use]
    pub fn overrides(&self, dry_run: bool) -> ConfigOverrides {
        ConfigOverrides {
            binary: self.terraform.clone(),
            dir: self.dir.clone(),
            var_file: self.var_file.clone(),
            plan_file: self.plan.clone(),
            target: self.target.clone(),
            dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "tfstep",
            "run",
            "--dir",
            "infra",
            "--target",
            "aws_instance.web",
            "--dry-run",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { plan, dry_run } => {
                assert!(dry_run);
                let overrides = plan.overrides(dry_run);
                assert_eq!(overrides.dir, Some(PathBuf::from("infra")));
                assert_eq!(overrides.target.as_deref(), Some("aws_instance.web"));
                assert!(overrides.dry_run);
            }
            Commands::Graph { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_graph_with_global_flags() {
        let cli = Cli::try_parse_from(["tfstep", "graph", "--plan", "out.tfplan", "--output", "json", "-v"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Graph { plan } if plan.plan == Some(PathBuf::from("out.tfplan"))
        ));
    }
}
