//! Drag Reorder
//!
//! Turns "item dropped onto item" into a new order for their shared group.
//! Drops only reorder within one group; moving between groups goes through
//! `ItemStore::move_item`.

use sibling_order::{array_move, renumber};

use crate::commands::{ItemApi, ReorderArgs};
use crate::models::{ItemId, ItemNode};
use crate::store::{ItemStore, MirrorError, Undo};
use crate::tree::ItemTree;

/// New order for one sibling group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    /// Owner of the group, `None` for the top level
    pub parent: Option<ItemId>,
    /// The whole group in its new order, positions renumbered
    pub ordered: Vec<ItemNode>,
}

/// Plan dropping `source` onto `target`: `source` takes `target`'s index.
///
/// Returns `Ok(None)` when there is nothing to do (no target, or dropped on itself).
pub fn plan_reorder(
    tree: &ItemTree,
    source: &ItemId,
    target: Option<&ItemId>,
) -> Result<Option<ReorderPlan>, MirrorError> {
    let Some(target) = target.filter(|t| *t != source) else {
        return Ok(None);
    };

    let group = tree
        .find_sibling_array(source)
        .ok_or(MirrorError::UnknownItem(*source))?;
    let from = group
        .index_of(source)
        .ok_or(MirrorError::UnknownItem(*source))?;
    let Some(to) = group.index_of(target) else {
        return Err(if tree.find_node(target).is_some() {
            MirrorError::CrossGroupMove {
                dragged: *source,
                target: *target,
            }
        } else {
            MirrorError::UnknownItem(*target)
        });
    };

    let mut ordered = group.items.to_vec();
    array_move(&mut ordered, from, to);
    renumber(&mut ordered);

    Ok(Some(ReorderPlan {
        parent: group.parent,
        ordered,
    }))
}

impl<A: ItemApi> ItemStore<A> {
    /// Apply a drop locally, then persist the group's new order in one call.
    /// Drafts move with the group but are left out of the stored order.
    pub async fn reorder(&self, source: &ItemId, target: Option<&ItemId>) -> Result<(), MirrorError> {
        let Some(plan) = plan_reorder(&self.snapshot(), source, target)? else {
            return Ok(());
        };

        let ordered_ids: Vec<u32> = plan
            .ordered
            .iter()
            .filter_map(|node| node.id.persisted())
            .collect();
        let parent = plan.parent;

        let Some(undo) = self.apply(|tree| {
            let ids = tree
                .children_of(parent.as_ref())?
                .iter()
                .map(|node| node.id)
                .collect();
            tree.replace_sibling_array(parent.as_ref(), plan.ordered)
                .then_some(Undo::Order { parent, ids })
        }) else {
            return Err(MirrorError::UnknownItem(*source));
        };
        if ordered_ids.is_empty() {
            return Ok(());
        }

        let args = ReorderArgs {
            parent_id: parent.and_then(|p| p.persisted()),
            ordered_ids,
        };
        match self.api().reorder_items(args).await {
            Ok(group) => {
                log::debug!("Reordered {} items under {:?}", group.len(), parent);
                Ok(())
            }
            Err(e) => Err(self.roll_back(undo, "reorder", e).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::FlakyApi;
    use crate::models::Item;

    fn pid(id: u32) -> ItemId {
        ItemId::Persisted(id)
    }

    fn item(id: u32, parent_id: Option<u32>, position: i32) -> Item {
        Item {
            id,
            parent_id,
            name: ["A", "B", "C", "A1", "A2"][id as usize - 1].to_string(),
            completed: false,
            position,
        }
    }

    /// A [A1, A2], B, C
    fn sample() -> ItemTree {
        ItemTree::from_items(vec![
            item(1, None, 1),
            item(2, None, 2),
            item(3, None, 3),
            item(4, Some(1), 1),
            item(5, Some(1), 2),
        ])
    }

    fn order(nodes: &[ItemNode]) -> Vec<(String, i32)> {
        nodes.iter().map(|n| (n.name.clone(), n.position)).collect()
    }

    #[test]
    fn test_drag_up_takes_target_slot() {
        let plan = plan_reorder(&sample(), &pid(3), Some(&pid(1))).unwrap().unwrap();
        assert_eq!(plan.parent, None);
        assert_eq!(
            order(&plan.ordered),
            vec![
                ("C".to_string(), 1),
                ("A".to_string(), 2),
                ("B".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_drag_down_takes_target_slot() {
        let plan = plan_reorder(&sample(), &pid(1), Some(&pid(3))).unwrap().unwrap();
        let names: Vec<String> = plan.ordered.iter().map(|n| n.name.clone()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        // Subtree travels with its root
        assert_eq!(plan.ordered[2].children.len(), 2);
    }

    #[test]
    fn test_nested_group_keeps_parent() {
        let plan = plan_reorder(&sample(), &pid(5), Some(&pid(4))).unwrap().unwrap();
        assert_eq!(plan.parent, Some(pid(1)));
        assert_eq!(
            order(&plan.ordered),
            vec![("A2".to_string(), 1), ("A1".to_string(), 2)]
        );
    }

    #[test]
    fn test_noop_drops() {
        let tree = sample();
        assert_eq!(plan_reorder(&tree, &pid(2), None), Ok(None));
        assert_eq!(plan_reorder(&tree, &pid(2), Some(&pid(2))), Ok(None));
    }

    #[test]
    fn test_drop_outside_group_is_refused() {
        let tree = sample();
        assert_eq!(
            plan_reorder(&tree, &pid(4), Some(&pid(2))),
            Err(MirrorError::CrossGroupMove {
                dragged: pid(4),
                target: pid(2)
            })
        );
        assert_eq!(
            plan_reorder(&tree, &pid(4), Some(&pid(42))),
            Err(MirrorError::UnknownItem(pid(42)))
        );
        assert_eq!(
            plan_reorder(&tree, &pid(42), Some(&pid(1))),
            Err(MirrorError::UnknownItem(pid(42)))
        );
    }

    async fn loaded(names: &[&str]) -> ItemStore<FlakyApi> {
        let store = ItemStore::new(FlakyApi::with_items(names).await);
        store.load().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_reorder_persists_group_order() {
        let store = loaded(&["A", "B", "C"]).await;
        store.reorder(&pid(3), Some(&pid(1))).await.unwrap();

        assert_eq!(
            order(store.snapshot().roots()),
            vec![
                ("C".to_string(), 1),
                ("A".to_string(), 2),
                ("B".to_string(), 3)
            ]
        );
        let stored: Vec<(String, i32)> = store
            .api()
            .stored()
            .await
            .into_iter()
            .map(|i| (i.name, i.position))
            .collect();
        assert_eq!(stored, order(store.snapshot().roots()));
    }

    #[tokio::test]
    async fn test_drop_on_itself_changes_nothing() {
        let store = loaded(&["A", "B"]).await;
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.reorder(&pid(1), Some(&pid(1))).await.unwrap();
        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.api().calls(), vec!["list_items"]);
    }

    #[tokio::test]
    async fn test_drafts_reorder_locally_only() {
        let store = loaded(&["A", "B"]).await;
        let draft = store.add_top_level();

        store.reorder(&draft, Some(&pid(1))).await.unwrap();
        let roots = store.snapshot().roots().to_vec();
        assert_eq!(roots[0].id, draft);
        assert!(store.snapshot().is_consistent());

        // The store saw only its own two items, unchanged in order
        let stored: Vec<(u32, i32)> = store
            .api()
            .stored()
            .await
            .into_iter()
            .map(|i| (i.id, i.position))
            .collect();
        assert_eq!(stored, vec![(1, 1), (2, 2)]);
    }

    #[tokio::test]
    async fn test_failed_reorder_rolls_back() {
        let store = loaded(&["A", "B", "C"]).await;
        let before = store.snapshot();
        store.api().fail("reorder_items");

        let err = store.reorder(&pid(3), Some(&pid(1))).await.unwrap_err();
        assert!(matches!(err, MirrorError::Sync { action: "reorder", .. }));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_failed_reorder_keeps_rename_in_same_group() {
        let store = loaded(&["A", "B", "C"]).await;
        store.api().fail("reorder_items");
        let gate = store.api().hold("reorder_items");
        let (a, c) = (pid(1), pid(3));

        let (reordered, renamed) = tokio::join!(store.reorder(&c, Some(&a)), async {
            let renamed = store.rename(&a, "A2").await;
            gate.notify_one();
            renamed
        });
        assert!(reordered.is_err());
        assert!(renamed.is_ok());

        assert_eq!(
            order(store.snapshot().roots()),
            vec![
                ("A2".to_string(), 1),
                ("B".to_string(), 2),
                ("C".to_string(), 3)
            ]
        );
        let stored = ItemTree::from_items(store.api().stored().await);
        assert_eq!(store.snapshot(), stored);
    }
}
