//! Item Entity
//!
//! Represents a to-do item with hierarchical structure (single parent).

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use sibling_order::Positioned;

use super::entity::{DomainError, DomainResult, Entity};

/// A to-do item stored as one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier (0 until persisted)
    pub id: u32,
    /// Parent item ID (None = root level)
    pub parent_id: Option<u32>,
    /// Trimmed, non-empty
    pub name: String,
    #[serde(deserialize_with = "flexible_bool")]
    pub completed: bool,
    /// 1-based position within siblings
    pub position: i32,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl Item {
    /// Create a new root item with default values
    pub fn new(id: u32, name: String, position: i32) -> Self {
        Self {
            id,
            parent_id: None,
            name,
            completed: false,
            position,
            created_at: None,
            updated_at: None,
        }
    }

    /// Create a new child item under a parent
    pub fn new_child(id: u32, name: String, parent_id: u32, position: i32) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::new(id, name, position)
        }
    }

    /// Check if this is a root item (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl Entity for Item {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Positioned for Item {
    fn position(&self) -> i32 {
        self.position
    }

    fn set_position(&mut self, position: i32) {
        self.position = position;
    }
}

/// Partial update accepted by `Repository::update`.
///
/// Position and parent are changed only through moves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "flexible_bool_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed: Option<bool>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.completed.is_none()
    }
}

/// Nested view of the item table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTreeNode {
    #[serde(flatten)]
    pub item: Item,
    pub children: Vec<ItemTreeNode>,
}

/// Template for the default item set written by a reset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedItem {
    pub name: String,
    #[serde(default)]
    pub children: Vec<SeedItem>,
}

impl SeedItem {
    pub fn leaf(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
        }
    }
}

/// Trim `name` and reject it when nothing is left
pub fn normalize_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(
            "Name must be a non-empty string".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Assemble a flat item list into trees, children ordered by position
pub fn build_tree(items: Vec<Item>) -> Vec<ItemTreeNode> {
    let mut by_parent: HashMap<Option<u32>, Vec<Item>> = HashMap::new();
    for item in items {
        by_parent.entry(item.parent_id).or_default().push(item);
    }
    for group in by_parent.values_mut() {
        group.sort_by_key(|i| (i.position, i.id));
    }

    fn collect(
        parent_id: Option<u32>,
        by_parent: &mut HashMap<Option<u32>, Vec<Item>>,
    ) -> Vec<ItemTreeNode> {
        let group = by_parent.remove(&parent_id).unwrap_or_default();
        group
            .into_iter()
            .map(|item| {
                let children = collect(Some(item.id), by_parent);
                ItemTreeNode { item, children }
            })
            .collect()
    }

    collect(None, &mut by_parent)
}

/// Accept `true`/`false` as well as `0`/`1`
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(i64),
    }

    Ok(match BoolOrInt::deserialize(deserializer)? {
        BoolOrInt::Bool(b) => b,
        BoolOrInt::Int(n) => n != 0,
    })
}

fn flexible_bool_opt<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    flexible_bool(deserializer).map(Some)
}
