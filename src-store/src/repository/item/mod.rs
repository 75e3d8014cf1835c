//! Item Repository Module
//!
//! This module provides item repository functionality split into specialized sub-modules:
//! - item_repo: Core CRUD operations and shared transaction helpers
//! - item_hierarchy: Hierarchy operations (children, descendants, move, tree)
//! - item_positioning: Position management (append slot, reorder, reindex)
//! - item_maintenance: Bulk operations (reset, density audit)

mod item_hierarchy;
mod item_maintenance;
mod item_positioning;
mod item_repo;

pub use item_repo::ItemRepository;

// Re-export all operation traits so they can be used by importing ItemRepository
pub use item_hierarchy::ItemHierarchyOperations;
pub use item_maintenance::ItemMaintenanceOperations;
pub use item_positioning::ItemPositioningOperations;
