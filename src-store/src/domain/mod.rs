//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! No storage dependencies; serde for serialization and sibling-order for positions.

mod entity;
mod item;

pub use entity::{Deleted, DomainError, DomainResult, Entity};
pub use item::{build_tree, normalize_name, Item, ItemPatch, ItemTreeNode, SeedItem};
