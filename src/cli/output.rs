//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use std::time::Duration;
use tabled::{Table, Tabled};

use crate::plan::{ChangeItem, ChangeKind, ChangePlan, ItemStatus};
use crate::planner::ExecutionPlan;
use crate::stepper::{RunOutcome, StepReport};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Execution order row for table display.
#[derive(Tabled)]
struct LayerItemRow {
    #[tabled(rename = "Layer")]
    layer: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Depends on")]
    depends_on: String,
}

/// Executed item row for table display.
#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Time")]
    time: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns true if output is machine-readable.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Formats the plan header and per-kind counts.
    #[must_use]
    pub fn format_plan_summary(&self, plan: &ChangePlan) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanSummaryJson::from(plan)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_summary_text(plan),
        }
    }

    fn format_plan_summary_text(plan: &ChangePlan) -> String {
        let mut output = format!("\n{}\n", "Terraform Step Debugger".bold());

        if let Some(plan_file) = &plan.plan_file {
            let _ = writeln!(output, "Plan file: {}", plan_file.display());
        }
        if let Some(dir) = &plan.working_dir {
            let _ = writeln!(output, "Directory: {}", dir.display());
        }

        let stats = plan.stats;
        let _ = write!(output, "\n{}\n", "Plan Summary:".bold());
        let _ = writeln!(output, "  {} {}", "Creates:".green(), stats.create);
        let _ = writeln!(output, "  {} {}", "Updates:".yellow(), stats.update);
        let _ = writeln!(output, "  {} {}", "Deletes:".red(), stats.delete);
        let _ = writeln!(output, "  {} {}", "Reads:".cyan(), stats.read);
        let _ = writeln!(output, "  {} {}", "Noops:".blue(), stats.noop);

        output
    }

    /// Formats the layered execution order.
    #[must_use]
    pub fn format_execution_plan(&self, plan: &ExecutionPlan) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(plan).unwrap_or_default(),
            OutputFormat::Text => Self::format_execution_plan_text(plan),
        }
    }

    fn format_execution_plan_text(plan: &ExecutionPlan) -> String {
        if plan.is_empty() {
            return format!("{} No changes to apply.\n", "✓".green());
        }

        let mut output = format!(
            "\n{} ({} resources in {} layers)\n",
            "Execution Order".bold(),
            plan.item_count(),
            plan.len()
        );

        let rows: Vec<LayerItemRow> = plan
            .layers()
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| {
                let label = if layer.forced {
                    format!("{} (cycle)", i + 1)
                } else {
                    (i + 1).to_string()
                };
                layer.items.iter().map(move |item| LayerItemRow {
                    layer: label.clone(),
                    action: Self::format_kind(item.kind),
                    resource: item.id.clone(),
                    depends_on: Self::truncate(&item.depends_on.join(", "), 60),
                })
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let forced = plan.forced_layers();
        if !forced.is_empty() {
            let _ = write!(
                output,
                "\n{} Dependency cycles were broken at {} layer(s); review the order before applying.\n",
                "⚠".yellow(),
                forced.len()
            );
        }

        output
    }

    /// Formats the banner shown before the first item of a layer.
    #[must_use]
    pub fn format_layer_header(index: usize, total: usize, forced: bool) -> String {
        let mut header = format!("Executing layer {index} of {total}").bold().to_string();
        if forced {
            let _ = write!(header, " {}", "(dependency cycle broken here)".yellow());
        }
        header
    }

    /// Formats progress plus the item about to be prompted for.
    #[must_use]
    pub fn format_item(item: &ChangeItem, position: usize, total: usize) -> String {
        let mut output = format!(
            "[{position}/{total}] {:.1}% complete\n",
            Self::percent(position, total)
        );

        let _ = write!(output, "\n{} {}\n", "Resource:".bold(), item.id.bold());
        let _ = writeln!(output, "  {} {}", "Action:".bold(), Self::format_kind(item.kind));
        let _ = writeln!(output, "  {} {}", "Type:".bold(), item.resource_type);

        if !item.depends_on.is_empty() {
            let _ = writeln!(output, "  {}", "Dependencies:".bold());
            for dep in &item.depends_on {
                let _ = writeln!(output, "    - {dep}");
            }
        }

        if !item.warnings.is_empty() {
            let _ = writeln!(output, "  {}", "Warnings:".bold());
            for warning in &item.warnings {
                let _ = writeln!(output, "    - {}", warning.yellow());
            }
        }

        output
    }

    /// Frames diff text for an item.
    #[must_use]
    pub fn format_detail(text: &str) -> String {
        let rule = "-".repeat(80);
        format!("\n{}\n{rule}\n{}\n{rule}\n", "Resource Details:".bold(), text.trim_end())
    }

    /// Formats the outcome of one apply.
    #[must_use]
    pub fn format_apply_result(item: &ChangeItem, elapsed: Duration) -> String {
        let seconds = elapsed.as_secs_f64();
        if item.status == ItemStatus::Failed {
            format!(
                "{} Could not apply {} ({seconds:.2} seconds)",
                "Failure:".red(),
                item.id
            )
        } else {
            format!(
                "{} Applied {} in {seconds:.2} seconds",
                "Success:".green(),
                item.id
            )
        }
    }

    /// Formats the end-of-run summary.
    #[must_use]
    pub fn format_report(&self, report: &StepReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    fn format_report_text(report: &StepReport) -> String {
        let counts = report.counts();
        let mut output = format!("\n{}\n", "Execution Summary:".bold());
        let _ = writeln!(output, "  {} {}", "Completed:".green(), counts.completed);
        let _ = writeln!(output, "  {} {}", "Skipped:".yellow(), counts.skipped);
        let _ = writeln!(output, "  {} {}", "Failed:".red(), counts.failed);

        if !report.executed.is_empty() {
            let rows: Vec<ResultRow> = report
                .executed
                .iter()
                .enumerate()
                .map(|(i, item)| ResultRow {
                    index: i + 1,
                    resource: item.id.clone(),
                    action: Self::format_kind(item.kind),
                    status: Self::format_status(item.status),
                    time: report
                        .elapsed_for(&item.id)
                        .map_or_else(|| String::from("-"), |d| format!("{:.2}s", d.as_secs_f64())),
                })
                .collect();

            output.push('\n');
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        let elapsed = report.finished_at - report.started_at;
        let status = match report.outcome {
            RunOutcome::Completed => format!("{} Execution complete.", "✓".green()),
            RunOutcome::Aborted { reason } => format!("{} Execution {reason}.", "✗".red()),
        };
        let _ = write!(
            output,
            "\n{status} ({}s)\n",
            elapsed.num_seconds()
        );

        output
    }

    /// Formats a change kind with color.
    fn format_kind(kind: ChangeKind) -> String {
        match kind {
            ChangeKind::Create => "create".green().to_string(),
            ChangeKind::Update => "update".yellow().to_string(),
            ChangeKind::Delete => "delete".red().to_string(),
            ChangeKind::Read => "read".cyan().to_string(),
            ChangeKind::NoChange => "no-op".dimmed().to_string(),
        }
    }

    /// Formats an item status with color.
    fn format_status(status: ItemStatus) -> String {
        match status {
            ItemStatus::Completed => status.to_string().green().to_string(),
            ItemStatus::Skipped => status.to_string().yellow().to_string(),
            ItemStatus::Failed => status.to_string().red().to_string(),
            ItemStatus::Pending | ItemStatus::Approved => status.to_string().dimmed().to_string(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn percent(position: usize, total: usize) -> f64 {
        if total == 0 {
            return 100.0;
        }
        position as f64 / total as f64 * 100.0
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.message("warning", &"⚠".yellow(), message)
    }

    fn message(&self, status: &str, marker: &colored::ColoredString, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": status, "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{marker} {message}"),
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct PlanSummaryJson<'a> {
    plan_file: Option<String>,
    working_dir: Option<String>,
    stats: crate::plan::PlanStats,
    schedulable: usize,
    items: &'a [ChangeItem],
}

impl<'a> From<&'a ChangePlan> for PlanSummaryJson<'a> {
    fn from(plan: &'a ChangePlan) -> Self {
        Self {
            plan_file: plan.plan_file.as_ref().map(|p| p.display().to_string()),
            working_dir: plan.working_dir.as_ref().map(|p| p.display().to_string()),
            stats: plan.stats,
            schedulable: plan.schedulable_count(),
            items: &plan.items,
        }
    }
}
