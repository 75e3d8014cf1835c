//! Item Maintenance Operations
//!
//! Bulk operations over the whole item table: reset with reseed and the
//! position density audit.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rusqlite::Connection;

use super::item_positioning::reindex_group;
use super::item_repo::{insert_item, ItemRepository};
use crate::domain::{DomainResult, Item, SeedItem};
use crate::repository::Repository;

/// Trait for bulk item operations
#[async_trait]
pub trait ItemMaintenanceOperations {
    /// Delete every item and write `seed` in its place
    async fn reset(&self, seed: &[SeedItem]) -> DomainResult<Vec<Item>>;

    /// True when the table holds no items
    async fn is_empty(&self) -> DomainResult<bool>;

    /// Parents whose child positions are not exactly 1..N
    async fn find_gaps(&self) -> DomainResult<Vec<Option<u32>>>;

    /// Reindex every group reported by `find_gaps`. Returns the number of groups fixed.
    async fn repair_positions(&self) -> DomainResult<usize>;
}

fn insert_seed(conn: &Connection, parent_id: Option<u32>, seed: &[SeedItem]) -> DomainResult<()> {
    for (index, entry) in seed.iter().enumerate() {
        let item = insert_item(conn, &entry.name, parent_id, index as i32 + 1, false)?;
        insert_seed(conn, Some(item.id), &entry.children)?;
    }
    Ok(())
}

fn gaps(conn: &Connection) -> DomainResult<Vec<Option<u32>>> {
    let mut stmt = conn.prepare("SELECT parent_id, position FROM items ORDER BY parent_id, position")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, Option<u32>>(0)?, row.get::<_, i32>(1)?))
    })?;

    let mut groups: BTreeMap<Option<u32>, Vec<i32>> = BTreeMap::new();
    for row in rows {
        let (parent_id, position) = row?;
        groups.entry(parent_id).or_default().push(position);
    }

    Ok(groups
        .into_iter()
        .filter(|(_, positions)| {
            // Sorted by the query, so dense means position == index + 1
            positions.iter().enumerate().any(|(i, p)| *p != i as i32 + 1)
        })
        .map(|(parent_id, _)| parent_id)
        .collect())
}

#[async_trait]
impl ItemMaintenanceOperations for ItemRepository {
    async fn reset(&self, seed: &[SeedItem]) -> DomainResult<Vec<Item>> {
        {
            let mut conn = self.conn.lock().await;
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM items", [])?;
            tx.execute("DELETE FROM sqlite_sequence WHERE name = 'items'", [])?;
            insert_seed(&tx, None, seed)?;
            tx.commit()?;
        }
        log::info!("Item list reset with {} seed items", seed.len());
        self.list().await
    }

    async fn is_empty(&self) -> DomainResult<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    async fn find_gaps(&self) -> DomainResult<Vec<Option<u32>>> {
        let conn = self.conn.lock().await;
        gaps(&conn)
    }

    async fn repair_positions(&self) -> DomainResult<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let broken = gaps(&tx)?;
        for parent_id in &broken {
            log::warn!("Repairing positions under {:?}", parent_id);
            reindex_group(&tx, *parent_id)?;
        }
        tx.commit()?;
        Ok(broken.len())
    }
}
