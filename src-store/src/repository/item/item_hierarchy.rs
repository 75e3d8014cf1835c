//! Item Hierarchy Operations
//!
//! Operations for managing parent-child relationships between items.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use sibling_order::{array_move, renumber, shift_for_insert, shift_for_remove};

use super::item_repo::{
    ensure_parent, fetch_group, fetch_slots, now_millis, require_item, row_to_item, write_slots,
    ItemRepository, ITEM_COLUMNS,
};
use crate::domain::{build_tree, DomainError, DomainResult, Item, ItemTreeNode};
use crate::repository::Repository;

/// Trait for item hierarchy operations
#[async_trait]
pub trait ItemHierarchyOperations {
    /// Get children of a parent item (None = root items)
    async fn get_children(&self, parent_id: Option<u32>) -> DomainResult<Vec<Item>>;

    /// Move item to a new parent and 1-based position
    async fn move_to(&self, id: u32, new_parent_id: Option<u32>, position: i32) -> DomainResult<Item>;

    /// Get all descendants of an item, parents before children
    async fn get_descendants(&self, id: u32) -> DomainResult<Vec<Item>>;

    /// Whole table as nested trees
    async fn list_tree(&self) -> DomainResult<Vec<ItemTreeNode>>;
}

/// True when `candidate` sits somewhere below `ancestor`
fn is_descendant(conn: &Connection, ancestor: u32, candidate: u32) -> DomainResult<bool> {
    let found: i64 = conn.query_row(
        "WITH RECURSIVE descendants AS (
            SELECT id FROM items WHERE parent_id = ?1
            UNION ALL
            SELECT i.id FROM items i
            JOIN descendants d ON i.parent_id = d.id
        )
        SELECT COUNT(*) FROM descendants WHERE id = ?2",
        params![ancestor, candidate],
        |row| row.get(0),
    )?;
    Ok(found > 0)
}

fn move_item(
    conn: &Connection,
    id: u32,
    new_parent_id: Option<u32>,
    position: i32,
) -> DomainResult<Item> {
    let item = require_item(conn, id)?;

    if let Some(pid) = new_parent_id {
        if pid == id || is_descendant(conn, id, pid)? {
            return Err(DomainError::Validation(format!(
                "Cannot move item {} under itself or its descendant {}",
                id, pid
            )));
        }
    }
    ensure_parent(conn, new_parent_id)?;
    let now = now_millis();

    if new_parent_id == item.parent_id {
        // Same group: plain list reorder
        let mut slots = fetch_slots(conn, item.parent_id)?;
        if position < 1 || position as usize > slots.len() {
            return Err(DomainError::InvalidPosition(format!(
                "position {} is outside 1..={}",
                position,
                slots.len()
            )));
        }
        let from = slots
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| DomainError::Internal(format!("Item {} missing from its group", id)))?;
        array_move(&mut slots, from, position as usize - 1);
        renumber(&mut slots);
        write_slots(conn, &slots, now)?;
    } else {
        // Detach from the old group
        let mut old_slots = fetch_slots(conn, item.parent_id)?;
        old_slots.retain(|s| s.id != id);
        shift_for_remove(&mut old_slots, item.position);
        write_slots(conn, &old_slots, now)?;

        // Make room in the new one
        let mut new_slots = fetch_slots(conn, new_parent_id)?;
        shift_for_insert(&mut new_slots, position)?;
        write_slots(conn, &new_slots, now)?;

        conn.execute(
            "UPDATE items SET parent_id = ?, position = ?, updated_at = ? WHERE id = ?",
            params![new_parent_id, position, now, id],
        )?;
    }

    require_item(conn, id)
}

#[async_trait]
impl ItemHierarchyOperations for ItemRepository {
    async fn get_children(&self, parent_id: Option<u32>) -> DomainResult<Vec<Item>> {
        let conn = self.conn.lock().await;
        fetch_group(&conn, parent_id)
    }

    async fn move_to(&self, id: u32, new_parent_id: Option<u32>, position: i32) -> DomainResult<Item> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let item = move_item(&tx, id, new_parent_id, position)?;
        tx.commit()?;
        log::debug!("Moved item {} to {:?}/{}", id, new_parent_id, position);
        Ok(item)
    }

    async fn get_descendants(&self, id: u32) -> DomainResult<Vec<Item>> {
        let conn = self.conn.lock().await;
        require_item(&conn, id)?;

        let sql = format!(
            "WITH RECURSIVE descendants(id, depth) AS (
                SELECT id, 1 FROM items WHERE parent_id = ?
                UNION ALL
                SELECT i.id, d.depth + 1 FROM items i
                JOIN descendants d ON i.parent_id = d.id
            )
            SELECT {} FROM items
            JOIN descendants USING (id)
            ORDER BY descendants.depth, parent_id, position",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![id], row_to_item)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_tree(&self) -> DomainResult<Vec<ItemTreeNode>> {
        let items = self.list().await?;
        Ok(build_tree(items))
    }
}
