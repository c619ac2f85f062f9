//! Layered execution plan types.

use serde::Serialize;

use crate::plan::ChangeItem;

/// A batch of items with no unresolved dependency on later layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer {
    /// Items in this layer, in plan order.
    pub items: Vec<ChangeItem>,
    /// Whether this layer was forced to break a dependency cycle.
    pub forced: bool,
}

/// The ordered list of layers produced for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    layers: Vec<Layer>,
}

impl Layer {
    /// Creates a layer of mutually independent items.
    #[must_use]
    pub const fn ready(items: Vec<ChangeItem>) -> Self {
        Self {
            items,
            forced: false,
        }
    }

    /// Creates a single-item layer that breaks a cycle.
    #[must_use]
    pub fn forced(item: ChangeItem) -> Self {
        Self {
            items: vec![item],
            forced: true,
        }
    }

    /// Returns the number of items in the layer.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the layer has no items.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ExecutionPlan {
    /// Creates a plan from already-ordered layers.
    #[must_use]
    pub const fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// Returns the layers in execution order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Consumes the plan, returning its layers.
    #[must_use]
    pub fn into_layers(self) -> Vec<Layer> {
        self.layers
    }

    /// Returns the number of layers.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if there is nothing to execute.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the total number of scheduled items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    /// Iterates all items in execution order.
    pub fn items(&self) -> impl Iterator<Item = &ChangeItem> {
        self.layers.iter().flat_map(|layer| layer.items.iter())
    }

    /// Returns the index of the layer holding `id`.
    #[must_use]
    pub fn layer_of(&self, id: &str) -> Option<usize> {
        self.layers
            .iter()
            .position(|layer| layer.items.iter().any(|item| item.id == id))
    }

    /// Returns the indices of cycle-breaking layers.
    #[must_use]
    pub fn forced_layers(&self) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.forced)
            .map(|(i, _)| i)
            .collect()
    }
}

impl std::fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.layers.is_empty() {
            return write!(f, "No changes to apply");
        }

        writeln!(
            f,
            "Execution plan ({} items in {} layers):",
            self.item_count(),
            self.layers.len()
        )?;
        for (i, layer) in self.layers.iter().enumerate() {
            let marker = if layer.forced { " (cycle break)" } else { "" };
            writeln!(f, "  Layer {}{marker}:", i + 1)?;
            for item in &layer.items {
                writeln!(f, "    - {item}")?;
            }
        }
        Ok(())
    }
}
