//! Dependency-aware layering of change items.
//!
//! Items are peeled off in rounds: every round, each pending item whose
//! dependencies are no longer pending joins the next layer. Dependencies on
//! addresses outside the pending set (unknown, or already scheduled) never
//! block. When a round finds nothing ready the remaining items contain a
//! cycle, and exactly one item is forced into a layer of its own: the one
//! with the fewest still-pending dependencies, ties going to the smallest id.
//!
//! Layering never fails and never drops an item other than no-ops.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::plan::ChangeItem;

use super::layers::{ExecutionPlan, Layer};

/// Partitions schedulable items into dependency-ordered layers.
///
/// Items inside a layer keep their input order. `NoChange` items are
/// dropped; a repeated id keeps its first occurrence.
pub fn build_layers<I>(items: I) -> ExecutionPlan
where
    I: IntoIterator<Item = ChangeItem>,
{
    // `order` mirrors the keys of `pending` in input order.
    let mut order: Vec<String> = Vec::new();
    let mut pending: HashMap<String, ChangeItem> = HashMap::new();

    for item in items {
        if !item.kind.is_schedulable() {
            debug!("Excluding {} from scheduling (no changes)", item.id);
            continue;
        }
        if pending.contains_key(&item.id) {
            warn!("Duplicate change item {}, keeping the first occurrence", item.id);
            continue;
        }
        order.push(item.id.clone());
        pending.insert(item.id.clone(), item);
    }

    let mut layers = Vec::new();

    while !pending.is_empty() {
        let ready: Vec<String> = order
            .iter()
            .filter(|id| {
                pending
                    .get(id.as_str())
                    .is_some_and(|item| pending_dependencies(item, &pending) == 0)
            })
            .cloned()
            .collect();

        if ready.is_empty() {
            let Some((id, count)) = cycle_breaker(&order, &pending) else {
                break;
            };
            warn!(
                "Dependency cycle among {} remaining items; forcing {} ({} pending dependencies)",
                pending.len(),
                id,
                count
            );
            if let Some(item) = pending.remove(&id) {
                layers.push(Layer::forced(item));
            }
        } else {
            let items: Vec<ChangeItem> =
                ready.iter().filter_map(|id| pending.remove(id)).collect();
            debug!("Layer {}: {} items", layers.len() + 1, items.len());
            layers.push(Layer::ready(items));
        }

        order.retain(|id| pending.contains_key(id));
    }

    let plan = ExecutionPlan::new(layers);
    info!(
        "Built execution plan: {} items in {} layers",
        plan.item_count(),
        plan.len()
    );
    plan
}

/// Counts the dependencies of `item` that are still pending.
fn pending_dependencies(item: &ChangeItem, pending: &HashMap<String, ChangeItem>) -> usize {
    item.depends_on
        .iter()
        .filter(|dep| pending.contains_key(dep.as_str()))
        .count()
}

/// Picks the item to force when nothing is ready.
fn cycle_breaker(
    order: &[String],
    pending: &HashMap<String, ChangeItem>,
) -> Option<(String, usize)> {
    order
        .iter()
        .filter_map(|id| {
            pending
                .get(id)
                .map(|item| (id, pending_dependencies(item, pending)))
        })
        .min_by(|(a_id, a_count), (b_id, b_count)| {
            a_count.cmp(b_count).then_with(|| a_id.cmp(b_id))
        })
        .map(|(id, count)| (id.clone(), count))
}
