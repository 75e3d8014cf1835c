//! Repository Layer
//!
//! Data access abstractions and implementations.

mod db;
mod item;
mod traits;


pub use db::{init_db, DbState};
pub use item::{
    ItemHierarchyOperations, ItemMaintenanceOperations, ItemPositioningOperations, ItemRepository,
};
pub use traits::Repository;
