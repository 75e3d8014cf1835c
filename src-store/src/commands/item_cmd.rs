//! Item Commands
//!
//! Transport-facing handlers for item CRUD, hierarchy and ordering.
//! Each handler is one repository call; failures are logged and returned as-is.

use crate::domain::{Deleted, DomainResult, Item, ItemPatch, ItemTreeNode};
use crate::repository::{
    ItemHierarchyOperations, ItemMaintenanceOperations, ItemPositioningOperations, Repository,
};
use crate::AppState;

fn logged<T>(command: &str, result: DomainResult<T>) -> DomainResult<T> {
    if let Err(e) = &result {
        log::warn!("{} failed: {}", command, e);
    }
    result
}

/// Create a new item; `position` defaults to the end of the parent's group
pub async fn create_item(
    state: &AppState,
    name: String,
    parent_id: Option<u32>,
    position: Option<i32>,
) -> DomainResult<Item> {
    let result = async {
        let position = match position {
            Some(p) => p,
            None => state.item_repo.next_position(parent_id).await?,
        };
        let mut draft = Item::new(0, name, position);
        draft.parent_id = parent_id;
        state.item_repo.create(&draft).await
    }
    .await;
    logged("create_item", result)
}

/// List all items, ordered by parent then position
pub async fn list_items(state: &AppState) -> DomainResult<Vec<Item>> {
    logged("list_items", state.item_repo.list().await)
}

/// List all items as nested trees
pub async fn list_item_tree(state: &AppState) -> DomainResult<Vec<ItemTreeNode>> {
    logged("list_item_tree", state.item_repo.list_tree().await)
}

/// Get item by ID
pub async fn get_item(state: &AppState, id: u32) -> DomainResult<Option<Item>> {
    logged("get_item", state.item_repo.find_by_id(id).await)
}

/// Rename and/or complete an item
pub async fn update_item(state: &AppState, id: u32, patch: ItemPatch) -> DomainResult<Item> {
    logged("update_item", state.item_repo.update(id, &patch).await)
}

/// Toggle item completion status
pub async fn toggle_item(state: &AppState, id: u32) -> DomainResult<Item> {
    logged("toggle_item", state.item_repo.toggle_completed(id).await)
}

/// Delete item (cascade deletes children)
pub async fn delete_item(state: &AppState, id: u32) -> DomainResult<Deleted<u32>> {
    logged("delete_item", state.item_repo.delete(id).await)
}

/// Move item to new parent at position
pub async fn move_item(
    state: &AppState,
    id: u32,
    new_parent_id: Option<u32>,
    position: i32,
) -> DomainResult<Item> {
    logged(
        "move_item",
        state.item_repo.move_to(id, new_parent_id, position).await,
    )
}

/// Persist a drag result: the full new order of one sibling group
pub async fn reorder_items(
    state: &AppState,
    parent_id: Option<u32>,
    ordered_ids: Vec<u32>,
) -> DomainResult<Vec<Item>> {
    logged(
        "reorder_items",
        state.item_repo.reorder(parent_id, &ordered_ids).await,
    )
}

/// Get children of a parent (None = root items)
pub async fn get_children(state: &AppState, parent_id: Option<u32>) -> DomainResult<Vec<Item>> {
    logged("get_children", state.item_repo.get_children(parent_id).await)
}

/// Get all descendants of an item
pub async fn get_descendants(state: &AppState, id: u32) -> DomainResult<Vec<Item>> {
    logged("get_descendants", state.item_repo.get_descendants(id).await)
}

/// Start over: drop every item and write the configured seed
pub async fn reset_items(state: &AppState) -> DomainResult<Vec<Item>> {
    logged(
        "reset_items",
        state.item_repo.reset(&state.config.seed_items).await,
    )
}
