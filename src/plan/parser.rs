//! Parser for `terraform show -json` plan documents.
//!
//! Resource changes become [`ChangeItem`]s; dependency edges are recovered
//! from the root module configuration (explicit `depends_on` plus expression
//! references). Dependencies are not checked against the item set here:
//! unknown addresses are left in place and ignored during layering.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{PlanError, Result, StepError};

use super::model::{ChangeItem, ChangeKind, ChangePlan};

/// Reference prefixes that never name a managed resource.
const NON_RESOURCE_PREFIXES: &[&str] = &[
    "var.",
    "local.",
    "path.",
    "count.",
    "each.",
    "self.",
    "terraform.",
];

#[derive(Debug, Deserialize)]
struct PlanDocument {
    #[serde(default)]
    resource_changes: Vec<ResourceChange>,
    #[serde(default)]
    configuration: Option<Configuration>,
}

#[derive(Debug, Deserialize)]
struct ResourceChange {
    address: String,
    change: Change,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    warnings: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Configuration {
    #[serde(default)]
    root_module: Option<ConfigModule>,
}

#[derive(Debug, Deserialize)]
struct ConfigModule {
    #[serde(default)]
    resources: Vec<ConfigResource>,
}

#[derive(Debug, Deserialize)]
struct ConfigResource {
    #[serde(default)]
    mode: String,
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    expressions: Value,
}

/// Parser turning plan JSON into a [`ChangePlan`].
#[derive(Debug, Default)]
pub struct PlanParser;

impl PlanParser {
    /// Creates a new plan parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses a `terraform show -json` document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid plan JSON.
    pub fn parse_json(&self, json: &[u8]) -> Result<ChangePlan> {
        let document: PlanDocument = serde_json::from_slice(json)
            .map_err(|e| StepError::Plan(PlanError::invalid_json(e.to_string())))?;

        let dependencies = document
            .configuration
            .as_ref()
            .and_then(|c| c.root_module.as_ref())
            .map(build_dependency_map)
            .unwrap_or_default();

        let mut items = Vec::with_capacity(document.resource_changes.len());
        for change in document.resource_changes {
            let Some(kind) = change
                .change
                .actions
                .first()
                .and_then(|action| ChangeKind::from_action(action))
            else {
                debug!(
                    "Skipping {} with actions {:?}",
                    change.address, change.change.actions
                );
                continue;
            };

            let warnings = change
                .change
                .warnings
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();

            let deps = dependencies
                .get(&change.address)
                .cloned()
                .unwrap_or_default();

            items.push(
                ChangeItem::new(change.address, kind)
                    .with_dependencies(deps)
                    .with_warnings(warnings),
            );
        }

        let plan = ChangePlan::from_items(items);
        debug!(
            "Parsed plan: {} items, {} schedulable",
            plan.items.len(),
            plan.schedulable_count()
        );
        Ok(plan)
    }
}

/// Maps each configured resource address to its dependencies.
fn build_dependency_map(module: &ConfigModule) -> HashMap<String, Vec<String>> {
    module
        .resources
        .iter()
        .map(|resource| {
            let mut deps = resource.depends_on.clone();
            collect_references(&resource.expressions, &mut deps);
            (resource_address(resource), deps)
        })
        .collect()
}

fn resource_address(resource: &ConfigResource) -> String {
    let address = format!("{}.{}", resource.resource_type, resource.name);
    if resource.mode == "data" {
        format!("data.{address}")
    } else {
        address
    }
}

/// Walks an expression tree collecting resource references.
fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "references"
                    && let Value::Array(refs) = child
                {
                    out.extend(
                        refs.iter()
                            .filter_map(Value::as_str)
                            .filter(|r| is_resource_reference(r))
                            .map(str::to_string),
                    );
                } else {
                    collect_references(child, out);
                }
            }
        }
        Value::Array(values) => {
            for child in values {
                collect_references(child, out);
            }
        }
        _ => {}
    }
}

fn is_resource_reference(reference: &str) -> bool {
    reference.contains('.')
        && !NON_RESOURCE_PREFIXES
            .iter()
            .any(|prefix| reference.starts_with(prefix))
}
