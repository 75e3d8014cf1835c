//! Store Command Bindings
//!
//! The transport seam between the client mirror and the item store.
//! `ItemApi` is what the mirror calls; `LocalBackend` answers it in-process.

mod item;
mod local;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DeletedItem, Item};

// Re-export all public items
pub use item::*;
pub use local::LocalBackend;

/// Failure reported by the store or by the hop to it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    /// Store unreachable, failed internally, or answered with an undecodable payload
    #[error("transport error: {0}")]
    Transport(String),
}

/// Item operations the mirror needs from the store
#[async_trait]
pub trait ItemApi: Send + Sync {
    async fn list_items(&self) -> Result<Vec<Item>, ApiError>;

    async fn create_item(&self, args: CreateItemArgs) -> Result<Item, ApiError>;

    async fn update_item(&self, id: u32, args: UpdateItemArgs) -> Result<Item, ApiError>;

    /// Deletes the item and its subtree
    async fn delete_item(&self, id: u32) -> Result<DeletedItem, ApiError>;

    async fn move_item(&self, id: u32, args: MoveItemArgs) -> Result<Item, ApiError>;

    /// Persist the full new order of one sibling group; returns that group
    async fn reorder_items(&self, args: ReorderArgs) -> Result<Vec<Item>, ApiError>;

    /// Drop everything and reseed; returns the new flat list
    async fn reset_items(&self) -> Result<Vec<Item>, ApiError>;
}
