//! Tree Utilities
//!
//! The in-memory item forest the client mirrors from the store.
//! Every mutation reports whether it changed anything; a `false` return
//! means the tree was left untouched.

use std::collections::HashMap;

use sibling_order::{is_dense, renumber};

use crate::models::{Item, ItemId, ItemNode};

/// Ordered forest of item nodes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemTree {
    roots: Vec<ItemNode>,
}

/// One sibling group and the node that owns it (`None` = top level)
#[derive(Debug, Clone, Copy)]
pub struct SiblingArray<'a> {
    pub parent: Option<ItemId>,
    pub items: &'a [ItemNode],
}

impl SiblingArray<'_> {
    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|node| node.id == *id)
    }
}

impl ItemTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the nested tree from the store's flat list.
    /// Items whose parent is missing from the list are dropped.
    pub fn from_items(items: Vec<Item>) -> Self {
        let total = items.len();

        // Build parent -> children map
        let mut children_map: HashMap<Option<u32>, Vec<Item>> = HashMap::new();
        for item in items {
            children_map.entry(item.parent_id).or_default().push(item);
        }

        // Sort children by position
        for children in children_map.values_mut() {
            children.sort_by_key(|i| (i.position, i.id));
        }

        fn collect(
            parent_id: Option<u32>,
            children_map: &mut HashMap<Option<u32>, Vec<Item>>,
        ) -> Vec<ItemNode> {
            let Some(children) = children_map.remove(&parent_id) else {
                return Vec::new();
            };
            children
                .iter()
                .map(|item| {
                    let mut node = ItemNode::from_item(item);
                    node.children = collect(Some(item.id), children_map);
                    node
                })
                .collect()
        }

        let tree = Self {
            roots: collect(None, &mut children_map),
        };
        if tree.len() < total {
            log::warn!(
                "Dropped {} item(s) whose parent is missing",
                total - tree.len()
            );
        }
        tree
    }

    pub fn roots(&self) -> &[ItemNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes
    pub fn len(&self) -> usize {
        fn count(nodes: &[ItemNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }

    pub fn find_node(&self, id: &ItemId) -> Option<&ItemNode> {
        find_in(&self.roots, id)
    }

    /// The sibling group containing `id`
    pub fn find_sibling_array(&self, id: &ItemId) -> Option<SiblingArray<'_>> {
        let parent = locate_parent(&self.roots, None, id)?;
        let items = match &parent {
            None => self.roots.as_slice(),
            Some(pid) => self.find_node(pid)?.children.as_slice(),
        };
        Some(SiblingArray { parent, items })
    }

    /// Children of `parent`, or the roots for `None`
    pub fn children_of(&self, parent: Option<&ItemId>) -> Option<&[ItemNode]> {
        match parent {
            None => Some(self.roots.as_slice()),
            Some(pid) => self.find_node(pid).map(|n| n.children.as_slice()),
        }
    }

    /// Substitute the children of `parent` (the roots for `None`) with `items`,
    /// renumbered in the given order.
    pub fn replace_sibling_array(&mut self, parent: Option<&ItemId>, mut items: Vec<ItemNode>) -> bool {
        let Some(slot) = group_mut(&mut self.roots, parent) else {
            return false;
        };
        renumber(&mut items);
        for node in &mut items {
            node.parent_id = parent.copied();
        }
        *slot = items;
        true
    }

    pub fn update_node(&mut self, id: &ItemId, updater: impl FnOnce(&mut ItemNode)) -> bool {
        match find_in_mut(&mut self.roots, id) {
            Some(node) => {
                updater(node);
                true
            }
            None => false,
        }
    }

    /// Remove `id` with its subtree, closing the gap it leaves
    pub fn delete_node(&mut self, id: &ItemId) -> Option<ItemNode> {
        fn delete_in(nodes: &mut Vec<ItemNode>, id: &ItemId) -> Option<ItemNode> {
            if let Some(index) = nodes.iter().position(|n| n.id == *id) {
                let removed = nodes.remove(index);
                renumber(nodes);
                return Some(removed);
            }
            nodes.iter_mut().find_map(|n| delete_in(&mut n.children, id))
        }
        delete_in(&mut self.roots, id)
    }

    /// Insert `node` right after `target`, in the same group
    pub fn insert_adjacent(&mut self, target: &ItemId, mut node: ItemNode) -> bool {
        let Some(parent) = locate_parent(&self.roots, None, target) else {
            return false;
        };
        let Some(group) = group_mut(&mut self.roots, parent.as_ref()) else {
            return false;
        };
        let Some(index) = group.iter().position(|n| n.id == *target) else {
            return false;
        };
        node.parent_id = parent;
        group.insert(index + 1, node);
        renumber(group);
        true
    }

    /// Append `node` as the last child of `parent` (a root for `None`)
    pub fn append_child(&mut self, parent: Option<&ItemId>, mut node: ItemNode) -> bool {
        let Some(group) = group_mut(&mut self.roots, parent) else {
            return false;
        };
        node.parent_id = parent.copied();
        group.push(node);
        renumber(group);
        true
    }

    /// Insert `node` at 0-based `index` among the children of `parent`
    pub fn insert_child(&mut self, parent: Option<&ItemId>, index: usize, mut node: ItemNode) -> bool {
        let Some(group) = group_mut(&mut self.roots, parent) else {
            return false;
        };
        if index > group.len() {
            return false;
        }
        node.parent_id = parent.copied();
        group.insert(index, node);
        renumber(group);
        true
    }

    /// Detach `id` and insert it at 1-based `position` under `new_parent`.
    /// Refuses moves into the node's own subtree and out-of-range positions.
    pub fn move_node(&mut self, id: &ItemId, new_parent: Option<&ItemId>, position: i32) -> bool {
        let Some(node) = self.find_node(id) else {
            return false;
        };
        if let Some(pid) = new_parent {
            if pid == id || node.contains(pid) || self.find_node(pid).is_none() {
                return false;
            }
        }
        let Some(old_parent) = locate_parent(&self.roots, None, id) else {
            return false;
        };

        let dest_len = match new_parent {
            None => self.roots.len(),
            Some(pid) => self.find_node(pid).map_or(0, |n| n.children.len()),
        };
        let dest_len = if old_parent.as_ref() == new_parent {
            dest_len - 1
        } else {
            dest_len
        };
        if position < 1 || position as usize > dest_len + 1 {
            return false;
        }

        let Some(mut node) = self.delete_node(id) else {
            return false;
        };
        let Some(group) = group_mut(&mut self.roots, new_parent) else {
            return false;
        };
        node.parent_id = new_parent.copied();
        group.insert(position as usize - 1, node);
        renumber(group);
        true
    }

    /// Nodes in display order, with their depth (roots are 0)
    pub fn flatten(&self) -> Vec<(&ItemNode, usize)> {
        fn collect<'a>(nodes: &'a [ItemNode], depth: usize, result: &mut Vec<(&'a ItemNode, usize)>) {
            for node in nodes {
                result.push((node, depth));
                collect(&node.children, depth + 1, result);
            }
        }

        let mut result = Vec::new();
        collect(&self.roots, 0, &mut result);
        result
    }

    /// Number of levels; 0 for an empty tree
    pub fn max_depth(&self) -> usize {
        fn depth(nodes: &[ItemNode]) -> usize {
            nodes
                .iter()
                .map(|n| 1 + depth(&n.children))
                .max()
                .unwrap_or(0)
        }
        depth(&self.roots)
    }

    /// Every sibling group is dense, ascending, and points at its owner
    pub fn is_consistent(&self) -> bool {
        fn check(nodes: &[ItemNode], parent: Option<ItemId>) -> bool {
            is_dense(nodes)
                && nodes.windows(2).all(|w| w[0].position < w[1].position)
                && nodes
                    .iter()
                    .all(|n| n.parent_id == parent && check(&n.children, Some(n.id)))
        }
        check(&self.roots, None)
    }
}

fn find_in<'a>(nodes: &'a [ItemNode], id: &ItemId) -> Option<&'a ItemNode> {
    for node in nodes {
        if node.id == *id {
            return Some(node);
        }
        if let Some(found) = find_in(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(nodes: &'a mut [ItemNode], id: &ItemId) -> Option<&'a mut ItemNode> {
    for node in nodes {
        if node.id == *id {
            return Some(node);
        }
        if let Some(found) = find_in_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

/// Parent of the group containing `id`: `Some(None)` for the top level
fn locate_parent(nodes: &[ItemNode], parent: Option<ItemId>, id: &ItemId) -> Option<Option<ItemId>> {
    if nodes.iter().any(|n| n.id == *id) {
        return Some(parent);
    }
    nodes
        .iter()
        .find_map(|n| locate_parent(&n.children, Some(n.id), id))
}

fn group_mut<'a>(roots: &'a mut Vec<ItemNode>, parent: Option<&ItemId>) -> Option<&'a mut Vec<ItemNode>> {
    match parent {
        None => Some(roots),
        Some(pid) => find_in_mut(roots, pid).map(|n| &mut n.children),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_item(id: u32, parent_id: Option<u32>, position: i32) -> Item {
        Item {
            id,
            parent_id,
            name: format!("Item {}", id),
            completed: false,
            position,
        }
    }

    fn pid(id: u32) -> ItemId {
        ItemId::Persisted(id)
    }

    fn names(nodes: &[ItemNode]) -> Vec<(String, i32)> {
        nodes.iter().map(|n| (n.name.clone(), n.position)).collect()
    }

    /// 1 [3 [5], 4], 2
    fn sample() -> ItemTree {
        ItemTree::from_items(vec![
            make_item(2, None, 2),
            make_item(4, Some(1), 2),
            make_item(1, None, 1),
            make_item(5, Some(3), 1),
            make_item(3, Some(1), 1),
        ])
    }

    #[test]
    fn test_from_items_nests_and_orders() {
        let tree = sample();
        let flat: Vec<(ItemId, usize)> = tree.flatten().iter().map(|(n, d)| (n.id, *d)).collect();

        assert_eq!(
            flat,
            vec![(pid(1), 0), (pid(3), 1), (pid(5), 2), (pid(4), 1), (pid(2), 0)]
        );
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.max_depth(), 3);
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_from_items_drops_orphans() {
        let tree = ItemTree::from_items(vec![make_item(1, None, 1), make_item(7, Some(99), 1)]);
        assert_eq!(tree.len(), 1);
        assert!(tree.find_node(&pid(7)).is_none());
    }

    #[test]
    fn test_find_sibling_array() {
        let tree = sample();

        let top = tree.find_sibling_array(&pid(2)).unwrap();
        assert_eq!(top.parent, None);
        assert_eq!(top.index_of(&pid(2)), Some(1));

        let nested = tree.find_sibling_array(&pid(4)).unwrap();
        assert_eq!(nested.parent, Some(pid(1)));
        assert_eq!(nested.items.len(), 2);

        assert!(tree.find_sibling_array(&pid(42)).is_none());
    }

    #[test]
    fn test_replace_sibling_array_keyed_by_parent() {
        let mut tree = sample();
        let mut reversed = tree.find_node(&pid(1)).unwrap().children.clone();
        reversed.reverse();

        assert!(tree.replace_sibling_array(Some(&pid(1)), reversed));
        assert_eq!(
            names(&tree.find_node(&pid(1)).unwrap().children),
            vec![("Item 4".to_string(), 1), ("Item 3".to_string(), 2)]
        );
        // Grandchild kept with its subtree
        assert!(tree.find_node(&pid(5)).is_some());

        let before = tree.clone();
        assert!(!tree.replace_sibling_array(Some(&pid(42)), Vec::new()));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_update_node_keeps_children() {
        let mut tree = sample();
        assert!(tree.update_node(&pid(1), |n| n.name = "Renamed".into()));

        let node = tree.find_node(&pid(1)).unwrap();
        assert_eq!(node.name, "Renamed");
        assert_eq!(node.children.len(), 2);

        let before = tree.clone();
        assert!(!tree.update_node(&pid(42), |n| n.name = "x".into()));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_delete_node_renumbers_its_group_only() {
        let mut tree = sample();
        let removed = tree.delete_node(&pid(1)).unwrap();

        assert_eq!(removed.children.len(), 2);
        assert_eq!(tree.len(), 1);
        assert_eq!(names(tree.roots()), vec![("Item 2".to_string(), 1)]);
        assert!(tree.find_node(&pid(5)).is_none());
        assert!(tree.delete_node(&pid(1)).is_none());
    }

    #[test]
    fn test_insert_adjacent_and_append_child() {
        let mut tree = sample();
        let draft = ItemNode::draft(None);
        let draft_id = draft.id;

        assert!(tree.insert_adjacent(&pid(3), draft));
        let group = tree.find_sibling_array(&draft_id).unwrap();
        assert_eq!(group.parent, Some(pid(1)));
        assert_eq!(group.index_of(&draft_id), Some(1));
        assert_eq!(tree.find_node(&pid(4)).unwrap().position, 3);

        let child = ItemNode::draft(None);
        let child_id = child.id;
        assert!(tree.append_child(Some(&pid(2)), child));
        let node = tree.find_node(&child_id).unwrap();
        assert_eq!((node.parent_id, node.position), (Some(pid(2)), 1));

        assert!(!tree.append_child(Some(&pid(42)), ItemNode::draft(None)));
        assert!(!tree.insert_adjacent(&pid(42), ItemNode::draft(None)));
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_insert_child_puts_subtree_back() {
        let mut tree = sample();
        let before = tree.clone();
        let removed = tree.delete_node(&pid(3)).unwrap();

        assert!(!tree.insert_child(Some(&pid(1)), 5, removed.clone()));
        assert!(!tree.insert_child(Some(&pid(42)), 0, removed.clone()));
        assert!(tree.insert_child(Some(&pid(1)), 0, removed));
        assert_eq!(tree, before);
        assert_eq!(tree.children_of(Some(&pid(1))).map(|c| c.len()), Some(2));
        assert_eq!(tree.children_of(None).map(|c| c.len()), Some(2));
        assert!(tree.children_of(Some(&pid(42))).is_none());
    }

    #[test]
    fn test_move_node_across_groups() {
        let mut tree = sample();
        assert!(tree.move_node(&pid(4), None, 1));

        assert_eq!(
            names(tree.roots()),
            vec![
                ("Item 4".to_string(), 1),
                ("Item 1".to_string(), 2),
                ("Item 2".to_string(), 3)
            ]
        );
        assert_eq!(tree.find_node(&pid(1)).unwrap().children.len(), 1);
        assert_eq!(tree.find_node(&pid(4)).unwrap().parent_id, None);
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_move_node_within_group() {
        let mut tree = sample();
        assert!(tree.move_node(&pid(1), None, 2));
        assert_eq!(tree.roots()[0].id, pid(2));
        assert_eq!(tree.roots()[1].id, pid(1));
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_move_node_refusals_leave_tree_untouched() {
        let mut tree = sample();
        let before = tree.clone();

        // Into its own subtree
        assert!(!tree.move_node(&pid(1), Some(&pid(5)), 1));
        assert!(!tree.move_node(&pid(1), Some(&pid(1)), 1));
        // Out of range
        assert!(!tree.move_node(&pid(1), None, 3));
        assert!(!tree.move_node(&pid(3), Some(&pid(2)), 2));
        assert!(!tree.move_node(&pid(3), None, 0));
        // Unknown
        assert!(!tree.move_node(&pid(42), None, 1));

        assert_eq!(tree, before);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append(usize),
        AppendRoot,
        Adjacent(usize),
        Delete(usize),
        Move(usize, Option<usize>, i32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..64).prop_map(Op::Append),
            Just(Op::AppendRoot),
            (0usize..64).prop_map(Op::Adjacent),
            (0usize..64).prop_map(Op::Delete),
            (0usize..64, proptest::option::of(0usize..64), 0i32..6)
                .prop_map(|(a, b, p)| Op::Move(a, b, p)),
        ]
    }

    proptest! {
        #[test]
        fn prop_groups_stay_dense(ops in proptest::collection::vec(op(), 1..40)) {
            let mut tree = sample();
            let pick = |tree: &ItemTree, i: usize| {
                let flat = tree.flatten();
                (!flat.is_empty()).then(|| flat[i % flat.len()].0.id)
            };

            for op in ops {
                match op {
                    Op::AppendRoot => {
                        tree.append_child(None, ItemNode::draft(None));
                    }
                    Op::Append(i) => {
                        if let Some(id) = pick(&tree, i) {
                            tree.append_child(Some(&id), ItemNode::draft(None));
                        }
                    }
                    Op::Adjacent(i) => {
                        if let Some(id) = pick(&tree, i) {
                            tree.insert_adjacent(&id, ItemNode::draft(None));
                        }
                    }
                    Op::Delete(i) => {
                        if let Some(id) = pick(&tree, i) {
                            let before = tree.len();
                            let removed = tree.delete_node(&id).map(|n| {
                                ItemTree { roots: vec![n] }.len()
                            });
                            prop_assert_eq!(tree.len() + removed.unwrap_or(0), before);
                        }
                    }
                    Op::Move(i, parent, position) => {
                        if let Some(id) = pick(&tree, i) {
                            let parent = parent.and_then(|p| pick(&tree, p));
                            let before = tree.len();
                            tree.move_node(&id, parent.as_ref(), position);
                            prop_assert_eq!(tree.len(), before);
                        }
                    }
                }
                prop_assert!(tree.is_consistent());
            }
        }
    }
}
