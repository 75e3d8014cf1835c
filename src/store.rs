//! Client Mirror
//!
//! The client's copy of the item tree, published through a `watch` channel.
//!
//! Mutating actions follow one protocol: apply the change locally and publish
//! it, keeping a note of how to take it back, then call the store. When the
//! store accepts, its reply is folded back into the node. When it refuses, only
//! that action's change is undone on the current tree; if later actions have
//! touched the same nodes since, the tree is reloaded from the store instead.

use thiserror::Error;
use tokio::sync::watch;

use crate::commands::{ApiError, CreateItemArgs, ItemApi, MoveItemArgs, UpdateItemArgs};
use crate::models::{EditState, Item, ItemId, ItemNode};
use crate::tree::ItemTree;

/// Mirror-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    #[error("item {0} is not in the list")]
    UnknownItem(ItemId),
    #[error("item {0} must be saved before it can hold children")]
    UnsavedParent(ItemId),
    #[error("item {0} has not been saved yet")]
    NotSaved(ItemId),
    #[error("item name cannot be empty")]
    InvalidName,
    #[error("item {0} cannot be moved there")]
    InvalidMove(ItemId),
    #[error("items {dragged} and {target} are in different lists")]
    CrossGroupMove { dragged: ItemId, target: ItemId },
    /// The store refused or could not be reached; the tree was restored
    #[error("could not {action} item, changes were undone: {source}")]
    Sync {
        action: &'static str,
        source: ApiError,
    },
}

impl MirrorError {
    fn sync(action: &'static str) -> impl FnOnce(ApiError) -> MirrorError {
        move |source| MirrorError::Sync { action, source }
    }
}

/// Fields a save may change; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemEdit {
    pub name: Option<String>,
    pub completed: Option<bool>,
}

impl ItemEdit {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            completed: None,
        }
    }
}

/// Editable fields of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeFields {
    name: String,
    completed: bool,
    edit_state: EditState,
}

impl NodeFields {
    fn of(node: &ItemNode) -> Self {
        Self {
            name: node.name.clone(),
            completed: node.completed,
            edit_state: node.edit_state,
        }
    }
}

/// How to take back one action's local change
#[derive(Debug, Clone)]
pub(crate) enum Undo {
    /// Put `before` back, provided the node still shows what the action wrote
    Fields {
        id: ItemId,
        before: NodeFields,
        after: NodeFields,
    },
    /// Reinsert a deleted subtree where it was
    Reinsert {
        parent: Option<ItemId>,
        index: usize,
        node: ItemNode,
    },
    /// Move a node from `moved_to` back to its old slot
    MoveBack {
        id: ItemId,
        parent: Option<ItemId>,
        position: i32,
        moved_to: Option<ItemId>,
    },
    /// Restore a group's order, provided it still holds the same nodes
    Order {
        parent: Option<ItemId>,
        ids: Vec<ItemId>,
    },
    /// Refill a cleared tree, provided nothing was added since
    Refill(ItemTree),
}

impl Undo {
    /// Reverse the change on `tree`. Leaves the tree untouched and returns
    /// `None` when later changes make an exact reversal impossible.
    fn revert(self, tree: &mut ItemTree) -> Option<()> {
        match self {
            Undo::Fields { id, before, after } => {
                let node = tree.find_node(&id)?;
                if node.name != after.name || node.completed != after.completed {
                    return None;
                }
                tree.update_node(&id, |node| {
                    node.name = before.name;
                    node.completed = before.completed;
                    node.edit_state = before.edit_state;
                })
                .then_some(())
            }
            Undo::Reinsert {
                parent,
                index,
                node,
            } => {
                if tree.find_node(&node.id).is_some() {
                    return None;
                }
                tree.insert_child(parent.as_ref(), index, node).then_some(())
            }
            Undo::MoveBack {
                id,
                parent,
                position,
                moved_to,
            } => {
                if tree.find_sibling_array(&id)?.parent != moved_to {
                    return None;
                }
                tree.move_node(&id, parent.as_ref(), position).then_some(())
            }
            Undo::Order { parent, ids } => {
                let group = tree.children_of(parent.as_ref())?;
                if group.len() != ids.len() {
                    return None;
                }
                let nodes = ids
                    .iter()
                    .map(|id| group.iter().find(|n| n.id == *id).cloned())
                    .collect::<Option<Vec<_>>>()?;
                tree.replace_sibling_array(parent.as_ref(), nodes)
                    .then_some(())
            }
            Undo::Refill(before) => {
                if !tree.is_empty() {
                    return None;
                }
                *tree = before;
                Some(())
            }
        }
    }
}

/// Mirrored item tree bound to a store
pub struct ItemStore<A> {
    api: A,
    tree: watch::Sender<ItemTree>,
}

impl<A: ItemApi> ItemStore<A> {
    pub fn new(api: A) -> Self {
        let (tree, _) = watch::channel(ItemTree::new());
        Self { api, tree }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Receiver that sees every published tree
    pub fn subscribe(&self) -> watch::Receiver<ItemTree> {
        self.tree.subscribe()
    }

    pub fn snapshot(&self) -> ItemTree {
        self.tree.borrow().clone()
    }

    /// Replace the mirror with the store's current contents
    pub async fn load(&self) -> Result<(), MirrorError> {
        let items = self
            .api
            .list_items()
            .await
            .map_err(MirrorError::sync("load"))?;
        let tree = ItemTree::from_items(items);
        log::debug!("Loaded {} items", tree.len());
        self.tree.send_replace(tree);
        Ok(())
    }

    /// Run `change` on the tree and publish the result if it returned `Some`.
    /// `change` must leave the tree untouched when it returns `None`.
    pub(crate) fn apply<T>(&self, change: impl FnOnce(&mut ItemTree) -> Option<T>) -> Option<T> {
        let mut outcome = None;
        self.tree.send_if_modified(|tree| {
            outcome = change(tree);
            outcome.is_some()
        });
        outcome
    }

    /// Take back a refused action's change, or reload if it can't be taken back exactly
    pub(crate) async fn roll_back(&self, undo: Undo, action: &'static str, source: ApiError) -> MirrorError {
        log::warn!("{} failed, undoing local change: {}", action, source);
        let reverted = self
            .tree
            .send_if_modified(|tree| undo.revert(tree).is_some());
        if !reverted {
            log::warn!("Tree moved on since {} was applied, reloading", action);
            if let Err(e) = self.load().await {
                log::error!("Reload after failed {} also failed: {}", action, e);
            }
        }
        MirrorError::Sync { action, source }
    }

    /// Apply `edit` to one node, noting its fields before and after
    fn edit_node(&self, id: &ItemId, edit: impl FnOnce(&mut ItemNode)) -> Option<Undo> {
        self.apply(|tree| {
            let before = NodeFields::of(tree.find_node(id)?);
            tree.update_node(id, edit);
            let after = NodeFields::of(tree.find_node(id)?);
            Some(Undo::Fields {
                id: *id,
                before,
                after,
            })
        })
    }

    fn read<T>(&self, id: &ItemId, f: impl FnOnce(&ItemNode) -> T) -> Result<T, MirrorError> {
        self.tree
            .borrow()
            .find_node(id)
            .map(f)
            .ok_or(MirrorError::UnknownItem(*id))
    }

    /// Fold the store's copy of an item into the node now holding `id`.
    /// Positions stay local: drafts in the same group are invisible to the store.
    fn reconcile(&self, id: &ItemId, item: &Item) {
        let durable = ItemId::Persisted(item.id);
        let found = self.tree.send_if_modified(|tree| {
            tree.update_node(id, |node| {
                node.id = durable;
                node.name = item.name.clone();
                node.completed = item.completed;
                for child in &mut node.children {
                    child.parent_id = Some(durable);
                }
            })
        });
        if !found {
            log::warn!("Item {} left the tree before {} was confirmed", id, durable);
        }
    }

    // ========================
    // Local-only actions
    // ========================

    /// Open an empty draft at the end of the top level
    pub fn add_top_level(&self) -> ItemId {
        let draft = ItemNode::draft(None);
        let id = draft.id;
        self.tree.send_modify(|tree| {
            tree.append_child(None, draft);
        });
        id
    }

    /// Open an empty draft right after `target`
    pub fn add_sibling(&self, target: &ItemId) -> Result<ItemId, MirrorError> {
        let draft = ItemNode::draft(None);
        let id = draft.id;
        if self.tree.send_if_modified(|tree| tree.insert_adjacent(target, draft)) {
            Ok(id)
        } else {
            Err(MirrorError::UnknownItem(*target))
        }
    }

    /// Open an empty draft as the last child of `parent`
    pub fn add_child(&self, parent: &ItemId) -> Result<ItemId, MirrorError> {
        self.read(parent, |_| ())?;
        if parent.is_temporary() {
            return Err(MirrorError::UnsavedParent(*parent));
        }
        let draft = ItemNode::draft(Some(*parent));
        let id = draft.id;
        self.tree.send_modify(|tree| {
            tree.append_child(Some(parent), draft);
        });
        Ok(id)
    }

    pub fn begin_edit(&self, id: &ItemId) -> Result<(), MirrorError> {
        let found = self.tree.send_if_modified(|tree| {
            tree.update_node(id, |node| node.edit_state = EditState::Editing)
        });
        if found {
            Ok(())
        } else {
            Err(MirrorError::UnknownItem(*id))
        }
    }

    // ========================
    // Synced actions
    // ========================

    /// Commit an edit. A draft is created in the store and takes its durable
    /// id; a saved item is updated. Either way the node leaves edit mode.
    ///
    /// Saving a draft with a blank name discards it and returns `Ok(None)`.
    /// Drafts are always created open; `completed` applies to saved items only.
    pub async fn save(&self, id: &ItemId, edit: ItemEdit) -> Result<Option<ItemId>, MirrorError> {
        match id {
            ItemId::Temporary(_) => self.save_draft(id, edit.name).await,
            ItemId::Persisted(durable) => self
                .save_existing(id, *durable, edit, true)
                .await
                .map(|()| Some(*id)),
        }
    }

    pub async fn rename(&self, id: &ItemId, name: impl Into<String>) -> Result<Option<ItemId>, MirrorError> {
        self.save(id, ItemEdit::name(name)).await
    }

    /// Flip `completed` without leaving edit mode
    pub async fn toggle_completed(&self, id: &ItemId) -> Result<(), MirrorError> {
        let completed = self.read(id, |node| node.completed)?;
        let durable = id.persisted().ok_or(MirrorError::NotSaved(*id))?;
        let edit = ItemEdit {
            name: None,
            completed: Some(!completed),
        };
        self.save_existing(id, durable, edit, false).await
    }

    async fn save_draft(&self, id: &ItemId, name: Option<String>) -> Result<Option<ItemId>, MirrorError> {
        let (current, parent) = self.read(id, |node| (node.name.clone(), node.parent_id))?;
        let name = name.unwrap_or(current).trim().to_string();

        if name.is_empty() {
            self.tree.send_if_modified(|tree| tree.delete_node(id).is_some());
            log::debug!("Discarded empty draft {}", id);
            return Ok(None);
        }

        let parent_id = match parent {
            None => None,
            Some(ItemId::Persisted(pid)) => Some(pid),
            Some(unsaved) => return Err(MirrorError::UnsavedParent(unsaved)),
        };

        let Some(undo) = self.edit_node(id, |node| {
            node.name = name.clone();
            node.edit_state = EditState::Viewing;
        }) else {
            return Err(MirrorError::UnknownItem(*id));
        };
        let position = durable_position(&self.tree.borrow(), id).unwrap_or(1);

        let args = CreateItemArgs {
            name,
            parent_id,
            position,
        };
        match self.api.create_item(args).await {
            Ok(item) => {
                self.reconcile(id, &item);
                Ok(Some(ItemId::Persisted(item.id)))
            }
            Err(e) => Err(self.roll_back(undo, "create", e).await),
        }
    }

    async fn save_existing(
        &self,
        id: &ItemId,
        durable: u32,
        edit: ItemEdit,
        finish_edit: bool,
    ) -> Result<(), MirrorError> {
        let (current_name, current_completed) =
            self.read(id, |node| (node.name.clone(), node.completed))?;

        let name = match edit.name {
            Some(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(MirrorError::InvalidName);
                }
                Some(trimmed.to_string())
            }
            None => None,
        };
        let args = UpdateItemArgs {
            name: name.filter(|n| *n != current_name),
            completed: edit.completed.filter(|c| *c != current_completed),
        };

        let finish = |node: &mut ItemNode| {
            if finish_edit {
                node.edit_state = EditState::Viewing;
            }
        };

        // Nothing for the store to do
        if args.is_empty() {
            self.tree
                .send_if_modified(|tree| finish_edit && tree.update_node(id, finish));
            return Ok(());
        }

        let Some(undo) = self.edit_node(id, |node| {
            if let Some(name) = &args.name {
                node.name = name.clone();
            }
            if let Some(completed) = args.completed {
                node.completed = completed;
            }
            finish(node);
        }) else {
            return Err(MirrorError::UnknownItem(*id));
        };

        match self.api.update_item(durable, args).await {
            Ok(item) => {
                self.reconcile(id, &item);
                Ok(())
            }
            Err(e) => Err(self.roll_back(undo, "update", e).await),
        }
    }

    /// Remove an item and its subtree. Drafts are removed locally only.
    pub async fn delete(&self, id: &ItemId) -> Result<(), MirrorError> {
        let Some(undo) = self.apply(|tree| {
            let group = tree.find_sibling_array(id)?;
            let (parent, index) = (group.parent, group.index_of(id)?);
            let node = tree.delete_node(id)?;
            Some(Undo::Reinsert {
                parent,
                index,
                node,
            })
        }) else {
            return Err(MirrorError::UnknownItem(*id));
        };
        let Some(durable) = id.persisted() else {
            log::debug!("Dropped draft {}", id);
            return Ok(());
        };

        match self.api.delete_item(durable).await {
            Ok(deleted) => {
                log::debug!("Deleted item {} ({} rows)", deleted.id, deleted.removed);
                Ok(())
            }
            Err(e) => Err(self.roll_back(undo, "delete", e).await),
        }
    }

    /// Move a saved item under `new_parent` (top level for `None`) at 1-based `position`
    pub async fn move_item(
        &self,
        id: &ItemId,
        new_parent: Option<ItemId>,
        position: i32,
    ) -> Result<(), MirrorError> {
        self.read(id, |_| ())?;
        let durable = id.persisted().ok_or(MirrorError::NotSaved(*id))?;
        let new_parent_id = match new_parent {
            None => None,
            Some(parent) => {
                self.read(&parent, |_| ())?;
                Some(parent.persisted().ok_or(MirrorError::UnsavedParent(parent))?)
            }
        };

        let Some(undo) = self.apply(|tree| {
            let group = tree.find_sibling_array(id)?;
            let (parent, index) = (group.parent, group.index_of(id)?);
            tree.move_node(id, new_parent.as_ref(), position)
                .then_some(Undo::MoveBack {
                    id: *id,
                    parent,
                    position: index as i32 + 1,
                    moved_to: new_parent,
                })
        }) else {
            return Err(MirrorError::InvalidMove(*id));
        };
        let position = durable_position(&self.tree.borrow(), id).unwrap_or(position);

        let args = MoveItemArgs {
            new_parent_id,
            position,
        };
        match self.api.move_item(durable, args).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.roll_back(undo, "move", e).await),
        }
    }

    /// Drop everything and load the store's default list
    pub async fn reset(&self) -> Result<(), MirrorError> {
        let undo = self
            .apply(|tree| (!tree.is_empty()).then(|| Undo::Refill(std::mem::take(tree))))
            .unwrap_or_else(|| Undo::Refill(ItemTree::new()));
        match self.api.reset_items().await {
            Ok(items) => {
                self.tree.send_replace(ItemTree::from_items(items));
                Ok(())
            }
            Err(e) => Err(self.roll_back(undo, "reset", e).await),
        }
    }
}

/// Position of `id` counting only saved siblings, as the store numbers them
fn durable_position(tree: &ItemTree, id: &ItemId) -> Option<i32> {
    let group = tree.find_sibling_array(id)?;
    let index = group.index_of(id)?;
    let saved_before = group.items[..index].iter().filter(|n| !n.is_draft()).count();
    Some(saved_before as i32 + 1)
}
