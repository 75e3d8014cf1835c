//! In-process backend
//!
//! Calls the store's command handlers directly. Every argument and reply is
//! pushed through JSON so the client sees exactly what a remote store sends.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tasktree_store::commands;
use tasktree_store::config::StoreConfig;
use tasktree_store::domain::{DomainError, ItemPatch};
use tasktree_store::AppState;

use super::{ApiError, CreateItemArgs, ItemApi, MoveItemArgs, ReorderArgs, UpdateItemArgs};
use crate::models::{DeletedItem, Item};

/// `ItemApi` over a store opened in this process
#[derive(Clone)]
pub struct LocalBackend {
    state: Arc<AppState>,
}

impl LocalBackend {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Open (and seed, if configured) the store described by `config`
    pub async fn open(config: StoreConfig) -> Result<Self, ApiError> {
        let state = tasktree_store::init(config).await?;
        Ok(Self::new(Arc::new(state)))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::InvalidPosition(msg) => ApiError::InvalidPosition(msg),
            DomainError::Internal(msg) => ApiError::Transport(msg),
        }
    }
}

/// Re-encode `value` as `T` through JSON
fn over_wire<S: Serialize, T: DeserializeOwned>(value: &S) -> Result<T, ApiError> {
    let json = serde_json::to_value(value).map_err(|e| ApiError::Transport(e.to_string()))?;
    serde_json::from_value(json)
        .map_err(|e| ApiError::Transport(format!("Undecodable payload: {}", e)))
}

#[async_trait]
impl ItemApi for LocalBackend {
    async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        let items = commands::list_items(&self.state).await?;
        over_wire(&items)
    }

    async fn create_item(&self, args: CreateItemArgs) -> Result<Item, ApiError> {
        let item = commands::create_item(
            &self.state,
            args.name,
            args.parent_id,
            Some(args.position),
        )
        .await?;
        over_wire(&item)
    }

    async fn update_item(&self, id: u32, args: UpdateItemArgs) -> Result<Item, ApiError> {
        let patch: ItemPatch = over_wire(&args)?;
        let item = commands::update_item(&self.state, id, patch).await?;
        over_wire(&item)
    }

    async fn delete_item(&self, id: u32) -> Result<DeletedItem, ApiError> {
        let deleted = commands::delete_item(&self.state, id).await?;
        over_wire(&deleted)
    }

    async fn move_item(&self, id: u32, args: MoveItemArgs) -> Result<Item, ApiError> {
        let item =
            commands::move_item(&self.state, id, args.new_parent_id, args.position).await?;
        over_wire(&item)
    }

    async fn reorder_items(&self, args: ReorderArgs) -> Result<Vec<Item>, ApiError> {
        let items = commands::reorder_items(&self.state, args.parent_id, args.ordered_ids).await?;
        over_wire(&items)
    }

    async fn reset_items(&self) -> Result<Vec<Item>, ApiError> {
        let items = commands::reset_items(&self.state).await?;
        over_wire(&items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend() -> LocalBackend {
        LocalBackend::open(StoreConfig::in_memory()).await.unwrap()
    }

    fn create(name: &str, parent_id: Option<u32>, position: i32) -> CreateItemArgs {
        CreateItemArgs {
            name: name.to_string(),
            parent_id,
            position,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_round_trip() {
        let api = backend().await;
        let a = api.create_item(create("A", None, 1)).await.unwrap();
        let b = api.create_item(create("B", Some(a.id), 1)).await.unwrap();

        assert_eq!(b.parent_id, Some(a.id));
        assert_eq!(api.list_items().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_partial_update_sends_only_given_fields() {
        let api = backend().await;
        let a = api.create_item(create("A", None, 1)).await.unwrap();

        let done = api
            .update_item(
                a.id,
                UpdateItemArgs {
                    completed: Some(true),
                    ..UpdateItemArgs::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(done.name, "A");
        assert!(done.completed);
    }

    #[tokio::test]
    async fn test_store_errors_keep_their_kind() {
        let api = backend().await;

        assert!(matches!(
            api.create_item(create("   ", None, 1)).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            api.create_item(create("A", None, 5)).await,
            Err(ApiError::InvalidPosition(_))
        ));
        assert!(matches!(
            api.delete_item(77).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_move_and_reorder() {
        let api = backend().await;
        let a = api.create_item(create("A", None, 1)).await.unwrap();
        let b = api.create_item(create("B", None, 2)).await.unwrap();
        let c = api.create_item(create("C", None, 3)).await.unwrap();

        let group = api
            .reorder_items(ReorderArgs {
                parent_id: None,
                ordered_ids: vec![c.id, a.id, b.id],
            })
            .await
            .unwrap();
        let order: Vec<(u32, i32)> = group.iter().map(|i| (i.id, i.position)).collect();
        assert_eq!(order, vec![(c.id, 1), (a.id, 2), (b.id, 3)]);

        let moved = api
            .move_item(
                b.id,
                MoveItemArgs {
                    new_parent_id: Some(c.id),
                    position: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!((moved.parent_id, moved.position), (Some(c.id), 1));

        let deleted = api.delete_item(c.id).await.unwrap();
        assert_eq!(deleted.removed, 2);
        assert_eq!(api.list_items().await.unwrap().len(), 1);
    }
}
