//! Tasktree client
//!
//! Keeps an in-memory copy of the item tree in step with the store:
//! - models: wire items and tree nodes
//! - tree: the item forest and its structural edits
//! - store: the mirror and its optimistic sync protocol
//! - dragdrop: turning drops into group reorders
//! - commands: the transport seam to the store

pub mod commands;
pub mod dragdrop;
pub mod models;
pub mod store;
pub mod tree;

pub use commands::{ApiError, ItemApi, LocalBackend};
pub use dragdrop::{plan_reorder, ReorderPlan};
pub use models::{EditState, Item, ItemId, ItemNode};
pub use store::{ItemEdit, ItemStore, MirrorError};
pub use tree::{ItemTree, SiblingArray};
