use crate::backend::{Api, BackendResult};

/// Move the entry at `from` to `to`, shifting the rest.
/// Returns false (and leaves the order alone) when nothing would move.
pub fn move_item<T>(order: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from == to || from >= order.len() || to >= order.len() {
        return false;
    }
    let item = order.remove(from);
    order.insert(to, item);
    true
}

/// Snapshot taken before an optimistic move, restored if persisting fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReorder {
    pub previous: Vec<String>,
}

/// Apply a move locally and keep what is needed to undo it.
pub fn begin_reorder(order: &mut Vec<String>, from: usize, to: usize) -> Option<PendingReorder> {
    let previous = order.clone();
    if move_item(order, from, to) {
        Some(PendingReorder { previous })
    } else {
        None
    }
}

impl PendingReorder {
    pub fn rollback(self, order: &mut Vec<String>) {
        *order = self.previous;
    }
}

/// Persist the display order (repository paths, first to last).
pub async fn persist_reorder(api: &Api, order: &[String]) -> BackendResult<()> {
    tracing::info!(projects = order.len(), "persisting project order");
    api.reorder_projects(order).await
}

/// Keep `local` for projects still present in `loaded`, appending any new ones in loaded order.
pub fn merge_order(local: &[String], loaded: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = local
        .iter()
        .filter(|p| loaded.contains(p))
        .cloned()
        .collect();
    for path in loaded {
        if !merged.contains(path) {
            merged.push(path.clone());
        }
    }
    merged
}

/// Order `items` by `order`; anything not mentioned keeps its relative place at the end.
pub fn apply_order<T>(items: &mut Vec<T>, order: &[String], key: impl Fn(&T) -> &str) {
    items.sort_by_key(|item| {
        order
            .iter()
            .position(|p| p == key(item))
            .unwrap_or(usize::MAX)
    });
}
