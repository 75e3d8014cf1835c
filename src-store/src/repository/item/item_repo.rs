//! Item Repository - Core CRUD Operations
//!
//! SQLite-backed implementation for Item CRUD operations.
//! Specialized operations are in separate modules:
//! - item_hierarchy: Hierarchy operations (children, descendants, move, tree)
//! - item_positioning: Position management (append slot, reorder, reindex)
//! - item_maintenance: Bulk operations (reset, density audit)
//!
//! The synchronous helpers here run inside an open transaction; the async
//! trait methods only take the lock, open the transaction and commit.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use sibling_order::{shift_for_insert, shift_for_remove, Positioned};
use tokio::sync::Mutex;

use super::super::traits::Repository;
use crate::domain::{normalize_name, Deleted, DomainError, DomainResult, Item, ItemPatch};

pub(super) const ITEM_COLUMNS: &str =
    "id, parent_id, name, completed, position, created_at, updated_at";

/// SQLite implementation of Item repository
pub struct ItemRepository {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl ItemRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Flip `completed` in place, in one transaction
    pub async fn toggle_completed(&self, id: u32) -> DomainResult<Item> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        require_item(&tx, id)?;
        tx.execute(
            "UPDATE items SET completed = NOT completed, updated_at = ? WHERE id = ?",
            params![now_millis(), id],
        )?;
        let item = require_item(&tx, id)?;
        tx.commit()?;
        Ok(item)
    }
}

/// Id and position of one sibling, tracking the stored value
#[derive(Debug, Clone, Copy)]
pub(super) struct Slot {
    pub id: u32,
    pub position: i32,
    stored: i32,
}

impl Slot {
    fn changed(&self) -> bool {
        self.position != self.stored
    }
}

impl Positioned for Slot {
    fn position(&self) -> i32 {
        self.position
    }

    fn set_position(&mut self, position: i32) {
        self.position = position;
    }
}

pub(super) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Convert a database row to Item
pub(super) fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        name: row.get(2)?,
        completed: row.get(3)?,
        position: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub(super) fn fetch_item(conn: &Connection, id: u32) -> DomainResult<Option<Item>> {
    let sql = format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_item).optional()?)
}

pub(super) fn require_item(conn: &Connection, id: u32) -> DomainResult<Item> {
    fetch_item(conn, id)?.ok_or_else(|| DomainError::NotFound(format!("Item {} not found", id)))
}

/// Items sharing `parent_id`, ordered by position
pub(super) fn fetch_group(conn: &Connection, parent_id: Option<u32>) -> DomainResult<Vec<Item>> {
    let sql = format!(
        "SELECT {} FROM items WHERE parent_id IS ? ORDER BY position, id",
        ITEM_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![parent_id], row_to_item)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Positions of the items sharing `parent_id`, ordered by position
pub(super) fn fetch_slots(conn: &Connection, parent_id: Option<u32>) -> DomainResult<Vec<Slot>> {
    let mut stmt =
        conn.prepare("SELECT id, position FROM items WHERE parent_id IS ? ORDER BY position, id")?;
    let rows = stmt.query_map(params![parent_id], |row| {
        let position: i32 = row.get(1)?;
        Ok(Slot {
            id: row.get(0)?,
            position,
            stored: position,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Write back the slots whose position changed. Returns how many rows were touched.
pub(super) fn write_slots(conn: &Connection, slots: &[Slot], now: i64) -> DomainResult<usize> {
    let mut stmt = conn.prepare("UPDATE items SET position = ?, updated_at = ? WHERE id = ?")?;
    let mut touched = 0;
    for slot in slots.iter().filter(|s| s.changed()) {
        stmt.execute(params![slot.position, now, slot.id])?;
        touched += 1;
    }
    Ok(touched)
}

pub(super) fn ensure_parent(conn: &Connection, parent_id: Option<u32>) -> DomainResult<()> {
    if let Some(pid) = parent_id {
        if fetch_item(conn, pid)?.is_none() {
            return Err(DomainError::NotFound(format!("Parent item {} not found", pid)));
        }
    }
    Ok(())
}

/// Insert `name` at `position` under `parent_id`, shifting the group to make room
pub(super) fn insert_item(
    conn: &Connection,
    name: &str,
    parent_id: Option<u32>,
    position: i32,
    completed: bool,
) -> DomainResult<Item> {
    let name = normalize_name(name)?;
    if position <= 0 {
        return Err(DomainError::Validation(
            "Position must be a positive number".to_string(),
        ));
    }
    ensure_parent(conn, parent_id)?;

    let now = now_millis();
    let mut slots = fetch_slots(conn, parent_id)?;
    shift_for_insert(&mut slots, position)?;
    write_slots(conn, &slots, now)?;

    conn.execute(
        "INSERT INTO items (parent_id, name, completed, position, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        params![parent_id, name, completed, position, now, now],
    )?;
    let id = u32::try_from(conn.last_insert_rowid()).map_err(|_| {
        DomainError::Internal(format!(
            "Row id {} does not fit an item id",
            conn.last_insert_rowid()
        ))
    })?;
    require_item(conn, id)
}

/// Remove `id` and its subtree, closing the gap in its sibling group
pub(super) fn delete_item(conn: &Connection, id: u32) -> DomainResult<Deleted<u32>> {
    let item = require_item(conn, id)?;

    // Counted up front: rows removed by the foreign key cascade are not reported as changes
    let descendants: i64 = conn.query_row(
        "WITH RECURSIVE descendants AS (
            SELECT id FROM items WHERE parent_id = ?
            UNION ALL
            SELECT i.id FROM items i
            JOIN descendants d ON i.parent_id = d.id
        )
        SELECT COUNT(*) FROM descendants",
        params![id],
        |row| row.get(0),
    )?;

    // Manual cascade so the subtree goes even when foreign keys are off
    conn.execute(
        "DELETE FROM items WHERE id IN (
            WITH RECURSIVE descendants AS (
                SELECT id FROM items WHERE parent_id = ?
                UNION ALL
                SELECT i.id FROM items i
                JOIN descendants d ON i.parent_id = d.id
            )
            SELECT id FROM descendants
        )",
        params![id],
    )?;
    conn.execute("DELETE FROM items WHERE id = ?", params![id])?;

    let mut slots = fetch_slots(conn, item.parent_id)?;
    shift_for_remove(&mut slots, item.position);
    write_slots(conn, &slots, now_millis())?;

    Ok(Deleted {
        id,
        removed: descendants as usize + 1,
    })
}

fn update_item(conn: &Connection, id: u32, patch: &ItemPatch) -> DomainResult<Item> {
    let mut item = require_item(conn, id)?;
    if let Some(name) = &patch.name {
        item.name = normalize_name(name)?;
    }
    if let Some(completed) = patch.completed {
        item.completed = completed;
    }

    conn.execute(
        "UPDATE items SET name = ?, completed = ?, updated_at = ? WHERE id = ?",
        params![item.name, item.completed, now_millis(), id],
    )?;
    require_item(conn, id)
}

#[async_trait]
impl Repository<Item> for ItemRepository {
    type Patch = ItemPatch;

    async fn create(&self, entity: &Item) -> DomainResult<Item> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let item = insert_item(
            &tx,
            &entity.name,
            entity.parent_id,
            entity.position,
            entity.completed,
        )?;
        tx.commit()?;
        log::debug!("Created item {} at {:?}/{}", item.id, item.parent_id, item.position);
        Ok(item)
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Item>> {
        let conn = self.conn.lock().await;
        fetch_item(&conn, id)
    }

    async fn list(&self) -> DomainResult<Vec<Item>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM items ORDER BY parent_id NULLS FIRST, position ASC, id ASC",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_item)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn update(&self, id: u32, patch: &ItemPatch) -> DomainResult<Item> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let item = update_item(&tx, id, patch)?;
        tx.commit()?;
        Ok(item)
    }

    async fn delete(&self, id: u32) -> DomainResult<Deleted<u32>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let deleted = delete_item(&tx, id)?;
        tx.commit()?;
        log::debug!("Deleted item {} ({} rows)", deleted.id, deleted.removed);
        Ok(deleted)
    }
}
