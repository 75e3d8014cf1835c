//! Frontend Models
//!
//! Wire shapes matching the store, plus the in-memory tree node.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use sibling_order::Positioned;
use uuid::Uuid;

/// Identity of a tree node: a local token until the store assigns a row id.
///
/// The two variants never compare equal, so a draft can't be mistaken for a
/// stored item that happens to share a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemId {
    Temporary(Uuid),
    Persisted(u32),
}

impl ItemId {
    /// Fresh temporary id
    pub fn temporary() -> Self {
        ItemId::Temporary(Uuid::new_v4())
    }

    /// Store id, if the item has been saved
    pub fn persisted(&self) -> Option<u32> {
        match self {
            ItemId::Persisted(id) => Some(*id),
            ItemId::Temporary(_) => None,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, ItemId::Temporary(_))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Temporary(token) => write!(f, "temp-{}", token),
            ItemId::Persisted(id) => write!(f, "{}", id),
        }
    }
}

impl From<u32> for ItemId {
    fn from(id: u32) -> Self {
        ItemId::Persisted(id)
    }
}

/// Item data structure (matches store)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub parent_id: Option<u32>,
    pub name: String,
    #[serde(deserialize_with = "flexible_bool")]
    pub completed: bool,
    pub position: i32,
}

/// Delete acknowledgement (matches store)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedItem {
    pub id: u32,
    pub removed: usize,
}

/// Whether a node shows its text or an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Viewing,
    Editing,
}

/// One node of the mirrored tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemNode {
    pub id: ItemId,
    pub parent_id: Option<ItemId>,
    pub name: String,
    pub completed: bool,
    pub position: i32,
    pub edit_state: EditState,
    pub children: Vec<ItemNode>,
}

impl ItemNode {
    /// Node for a stored item, without children
    pub fn from_item(item: &Item) -> Self {
        Self {
            id: ItemId::Persisted(item.id),
            parent_id: item.parent_id.map(ItemId::Persisted),
            name: item.name.clone(),
            completed: item.completed,
            position: item.position,
            edit_state: EditState::Viewing,
            children: Vec::new(),
        }
    }

    /// Unsaved, empty node opened for editing
    pub fn draft(parent_id: Option<ItemId>) -> Self {
        Self {
            id: ItemId::temporary(),
            parent_id,
            name: String::new(),
            completed: false,
            position: 0,
            edit_state: EditState::Editing,
            children: Vec::new(),
        }
    }

    pub fn is_draft(&self) -> bool {
        self.id.is_temporary()
    }

    /// True when `id` names a node strictly below this one
    pub fn contains(&self, id: &ItemId) -> bool {
        self.children
            .iter()
            .any(|child| child.id == *id || child.contains(id))
    }
}

impl Positioned for ItemNode {
    fn position(&self) -> i32 {
        self.position
    }

    fn set_position(&mut self, position: i32) {
        self.position = position;
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_never_cross_variants() {
        let temp = ItemId::temporary();
        assert_ne!(temp, ItemId::Persisted(1));
        assert_ne!(ItemId::temporary(), ItemId::temporary());
        assert!(temp.to_string().starts_with("temp-"));
        assert_eq!(ItemId::from(7).to_string(), "7");
        assert_eq!(temp.persisted(), None);
        assert_eq!(ItemId::Persisted(7).persisted(), Some(7));
    }

    #[test]
    fn test_wire_item_accepts_integer_completed() {
        let item: Item = serde_json::from_str(
            r#"{"id":4,"parent_id":2,"name":"x","completed":1,"position":3,"updated_at":17}"#,
        )
        .unwrap();
        assert!(item.completed);
        assert_eq!(item.parent_id, Some(2));

        let node = ItemNode::from_item(&item);
        assert_eq!(node.id, ItemId::Persisted(4));
        assert_eq!(node.parent_id, Some(ItemId::Persisted(2)));
        assert_eq!(node.edit_state, EditState::Viewing);
    }

    #[test]
    fn test_draft_starts_editing() {
        let draft = ItemNode::draft(None);
        assert!(draft.is_draft());
        assert_eq!(draft.edit_state, EditState::Editing);
        assert!(draft.name.is_empty());
    }
}
