//! Item Positioning Operations
//!
//! Operations for managing item positions within their parent hierarchy.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use rusqlite::Connection;
use sibling_order::renumber;

use super::item_repo::{
    ensure_parent, fetch_group, fetch_slots, now_millis, write_slots, ItemRepository,
};
use crate::domain::{DomainError, DomainResult, Item};

/// Trait for item positioning operations
#[async_trait]
pub trait ItemPositioningOperations {
    /// Position that appends to a parent's group (N + 1)
    async fn next_position(&self, parent_id: Option<u32>) -> DomainResult<i32>;

    /// Renumber a whole group in the given order.
    ///
    /// `ordered_ids` must name every item under `parent_id` exactly once.
    async fn reorder(&self, parent_id: Option<u32>, ordered_ids: &[u32]) -> DomainResult<Vec<Item>>;

    /// Reindex items under a parent to be sequential (1, 2, 3, ...)
    async fn reindex_items(&self, parent_id: Option<u32>) -> DomainResult<usize>;
}

fn reorder_group(
    conn: &Connection,
    parent_id: Option<u32>,
    ordered_ids: &[u32],
) -> DomainResult<Vec<Item>> {
    ensure_parent(conn, parent_id)?;
    let slots = fetch_slots(conn, parent_id)?;

    let requested: HashSet<u32> = ordered_ids.iter().copied().collect();
    let current: HashSet<u32> = slots.iter().map(|s| s.id).collect();
    if requested.len() != ordered_ids.len() || requested != current {
        return Err(DomainError::Validation(format!(
            "Reorder of {:?} must list each of its {} items exactly once",
            parent_id,
            slots.len()
        )));
    }

    let by_id: HashMap<u32, _> = slots.into_iter().map(|s| (s.id, s)).collect();
    let mut ordered: Vec<_> = ordered_ids.iter().filter_map(|id| by_id.get(id).copied()).collect();
    renumber(&mut ordered);
    write_slots(conn, &ordered, now_millis())?;

    fetch_group(conn, parent_id)
}

/// Renumber one group by its current (position, id) order
pub(super) fn reindex_group(conn: &Connection, parent_id: Option<u32>) -> DomainResult<usize> {
    let mut slots = fetch_slots(conn, parent_id)?;
    renumber(&mut slots);
    write_slots(conn, &slots, now_millis())
}

#[async_trait]
impl ItemPositioningOperations for ItemRepository {
    async fn next_position(&self, parent_id: Option<u32>) -> DomainResult<i32> {
        let conn = self.conn.lock().await;
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE parent_id IS ?",
            [parent_id],
            |row| row.get(0),
        )?;
        Ok(count + 1)
    }

    async fn reorder(&self, parent_id: Option<u32>, ordered_ids: &[u32]) -> DomainResult<Vec<Item>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let group = reorder_group(&tx, parent_id, ordered_ids)?;
        tx.commit()?;
        log::debug!("Reordered {} items under {:?}", group.len(), parent_id);
        Ok(group)
    }

    async fn reindex_items(&self, parent_id: Option<u32>) -> DomainResult<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let touched = reindex_group(&tx, parent_id)?;
        tx.commit()?;
        Ok(touched)
    }
}
