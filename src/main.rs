//! tfstep CLI entrypoint.
//!
//! This is the main entrypoint for the tfstep command-line tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tfstep::cli::{Cli, Commands, OutputFormatter, PlanArgs, TerminalOperator};
use tfstep::config::{ConfigOverrides, ConfigParser, ConfigValidator, StepConfig, find_config_file};
use tfstep::error::Result;
use tfstep::planner::build_layers;
use tfstep::stepper::{AbortReason, StepReport, Stepper};
use tfstep::terraform::{self, LoadedPlan, TerraformCli, TerraformExecutor};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Logs share stderr with the interactive prompts, so only warnings are
/// shown unless `--verbose` is given.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<ExitCode> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Run { plan, dry_run } => {
            cmd_run(cli.config.as_deref(), &plan, dry_run, &formatter).await
        }
        Commands::Graph { plan } => {
            cmd_graph(cli.config.as_deref(), &plan, &formatter).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Step through the plan interactively.
async fn cmd_run(
    config_path: Option<&Path>,
    args: &PlanArgs,
    dry_run: bool,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let config = load_config(config_path, args.overrides(dry_run), formatter)?;
    let client = create_terraform_client(&config).await?;

    let loaded = client.load_plan(config.run.plan_file.as_deref()).await?;
    emit(formatter, &formatter.format_plan_summary(&loaded.plan));

    if !loaded.plan.has_changes() {
        eprintln!("No changes to apply.");
        return Ok(ExitCode::SUCCESS);
    }

    ConfigValidator::new().validate_target(config.run.target.as_deref(), &loaded.plan)?;

    let report = step(&config, client, &loaded).await;
    emit(formatter, &formatter.format_report(&report));

    Ok(exit_code(&report))
}

/// Show the layered execution order.
async fn cmd_graph(
    config_path: Option<&Path>,
    args: &PlanArgs,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config = load_config(config_path, args.overrides(false), formatter)?;
    let client = create_terraform_client(&config).await?;

    let loaded = client.load_plan(config.run.plan_file.as_deref()).await?;
    let layers = build_layers(loaded.plan.items.iter().cloned());
    emit(formatter, &formatter.format_execution_plan(&layers));

    Ok(())
}

/// Runs the stepper over the loaded plan on the terminal.
async fn step(config: &StepConfig, client: TerraformCli, loaded: &LoadedPlan) -> StepReport {
    let layers = build_layers(loaded.plan.items.iter().cloned());
    info!(
        "Stepping through {} layers (generated plan: {})",
        layers.len(),
        loaded.is_generated()
    );

    let executor = TerraformExecutor::new(client).with_dry_run(config.run.dry_run);
    let mut operator = TerminalOperator::stdin();

    Stepper::new(&executor, &mut operator)
        .with_filter(config.run.target.clone())
        .run(layers)
        .await
}

/// Maps how a run ended to the process exit code.
fn exit_code(report: &StepReport) -> ExitCode {
    match report.abort_reason() {
        None | Some(AbortReason::Operator) => ExitCode::SUCCESS,
        Some(AbortReason::FailureDeclined | AbortReason::InputClosed) => ExitCode::FAILURE,
    }
}

/// Loads, overrides, and validates configuration.
fn load_config(
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
    formatter: &OutputFormatter,
) -> Result<StepConfig> {
    let config_file = resolve_config_path(config_path);

    let parser = ConfigParser::new().with_base_path(
        config_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(".")),
    );
    parser.load_dotenv()?;

    let config = parser
        .load_with_env(config_file.as_deref())?
        .with_overrides(overrides);

    let validation = ConfigValidator::new().validate(&config)?;
    for warning in &validation.warnings {
        eprintln!("{}", formatter.warning(warning));
    }

    debug!("Effective configuration: {config:?}");
    Ok(config)
}

/// Locates terraform and the working directory, and checks the version.
async fn create_terraform_client(config: &StepConfig) -> Result<TerraformCli> {
    let binary = terraform::locate(config.terraform.binary.as_deref())?;

    let dir = match &config.terraform.dir {
        Some(dir) => dir.clone(),
        None => terraform::find_terraform_dir(&std::env::current_dir()?)?,
    };

    let client = TerraformCli::new(binary, dir).with_var_file(config.terraform.var_file.clone());
    let version = client.version().await?;
    debug!(
        "terraform v{version} at {} in {}",
        client.binary().display(),
        client.dir().display()
    );

    Ok(client)
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&Path>) -> Option<PathBuf> {
    config_path.map_or_else(
        || std::env::current_dir().ok().and_then(find_config_file),
        |path| Some(path.to_path_buf()),
    )
}

/// Writes command output: JSON to stdout, text to stderr.
fn emit(formatter: &OutputFormatter, output: &str) {
    if formatter.is_json() {
        println!("{output}");
    } else {
        eprintln!("{output}");
    }
}
