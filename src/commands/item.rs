//! Item Commands
//!
//! Argument payloads for item-related store commands.

use serde::Serialize;

// ========================
// Argument Structs
// ========================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateItemArgs {
    pub name: String,
    pub parent_id: Option<u32>,
    pub position: i32,
}

/// Partial update; absent fields are left as stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateItemArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateItemArgs {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.completed.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveItemArgs {
    pub new_parent_id: Option<u32>,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReorderArgs {
    pub parent_id: Option<u32>,
    pub ordered_ids: Vec<u32>,
}
