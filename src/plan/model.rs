//! Change plan types.
//!
//! A [`ChangePlan`] is the one-shot batch of [`ChangeItem`]s loaded from an
//! external planner. Items are only ever reordered and annotated afterwards,
//! never created.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// The kind of change planned for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Create a new resource.
    #[serde(rename = "create")]
    Create,
    /// Update a resource in place.
    #[serde(rename = "update")]
    Update,
    /// Delete a resource.
    #[serde(rename = "delete")]
    Delete,
    /// Read a data source.
    #[serde(rename = "read")]
    Read,
    /// Nothing to do; never scheduled.
    #[serde(rename = "no-op")]
    NoChange,
}

/// Execution status of a change item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Not yet visited.
    #[default]
    Pending,
    /// Operator chose to apply; execution in progress.
    Approved,
    /// Operator chose to skip.
    Skipped,
    /// Apply was attempted and failed.
    Failed,
    /// Apply succeeded.
    #[serde(rename = "complete")]
    Completed,
}

/// One unit of planned work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeItem {
    /// Unique resource address, e.g. `aws_instance.web`.
    pub id: String,
    /// Resource type, e.g. `aws_instance`.
    pub resource_type: String,
    /// Resource name within its type, e.g. `web`.
    pub name: String,
    /// Planned change.
    pub kind: ChangeKind,
    /// Addresses this item must follow, de-duplicated, in declaration order.
    pub depends_on: Vec<String>,
    /// Current execution status.
    pub status: ItemStatus,
    /// Advisory messages; never affect scheduling.
    pub warnings: Vec<String>,
}

/// Per-kind counts for a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    /// Resources to create.
    pub create: usize,
    /// Resources to update.
    pub update: usize,
    /// Resources to delete.
    pub delete: usize,
    /// Data sources to read.
    pub read: usize,
    /// Resources with no changes.
    pub noop: usize,
}

/// A parsed change plan.
#[derive(Debug, Clone, Default)]
pub struct ChangePlan {
    /// All items in document order, including no-ops.
    pub items: Vec<ChangeItem>,
    /// Counts by kind.
    pub stats: PlanStats,
    /// Plan file the items were read from.
    pub plan_file: Option<PathBuf>,
    /// Terraform working directory.
    pub working_dir: Option<PathBuf>,
}

impl ChangeKind {
    /// Returns true if items of this kind take part in scheduling.
    #[must_use]
    pub const fn is_schedulable(self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Parses a Terraform action string.
    #[must_use]
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "read" => Some(Self::Read),
            "no-op" => Some(Self::NoChange),
            _ => None,
        }
    }

    /// Returns the display label for this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Read => "Read",
            Self::NoChange => "No-op",
        }
    }
}

impl ChangeItem {
    /// Creates a pending item with no dependencies, splitting the address
    /// into type and name.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ChangeKind) -> Self {
        let id = id.into();
        let (resource_type, name) = split_address(&id);
        Self {
            resource_type,
            name,
            id,
            kind,
            depends_on: Vec::new(),
            status: ItemStatus::Pending,
            warnings: Vec::new(),
        }
    }

    /// Sets the dependencies, dropping duplicates but keeping first-seen order.
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        self.depends_on.clear();
        for dep in deps {
            let dep: String = dep.into();
            if seen.insert(dep.clone()) {
                self.depends_on.push(dep);
            }
        }
        self
    }

    /// Sets the advisory warnings.
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

impl PlanStats {
    /// Records one item of the given kind.
    pub const fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Create => self.create += 1,
            ChangeKind::Update => self.update += 1,
            ChangeKind::Delete => self.delete += 1,
            ChangeKind::Read => self.read += 1,
            ChangeKind::NoChange => self.noop += 1,
        }
    }
}

impl ChangePlan {
    /// Creates a plan from items, computing stats.
    #[must_use]
    pub fn from_items(items: Vec<ChangeItem>) -> Self {
        let mut stats = PlanStats::default();
        for item in &items {
            stats.record(item.kind);
        }
        Self {
            items,
            stats,
            plan_file: None,
            working_dir: None,
        }
    }

    /// Returns true if any item needs scheduling.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.items.iter().any(|i| i.kind.is_schedulable())
    }

    /// Returns true if the item with this id will be stepped through.
    ///
    /// No-op items are in the plan but never scheduled, so they don't count.
    #[must_use]
    pub fn schedules(&self, id: &str) -> bool {
        self.items
            .iter()
            .any(|i| i.id == id && i.kind.is_schedulable())
    }

    /// Returns the number of schedulable items.
    #[must_use]
    pub fn schedulable_count(&self) -> usize {
        self.items.iter().filter(|i| i.kind.is_schedulable()).count()
    }
}

/// Splits `type.name` (or `data.type.name`) into its parts.
fn split_address(address: &str) -> (String, String) {
    let local = address.strip_prefix("data.").unwrap_or(address);
    match local.split_once('.') {
        Some((resource_type, name)) => (resource_type.to_string(), name.to_string()),
        None => (local.to_string(), String::new()),
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Read => "read",
            Self::NoChange => "no-op",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Completed => "complete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ChangeItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.kind)
    }
}
