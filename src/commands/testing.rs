//! Test backend with failure injection

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tasktree_store::config::StoreConfig;

use super::{
    ApiError, CreateItemArgs, ItemApi, LocalBackend, MoveItemArgs, ReorderArgs, UpdateItemArgs,
};
use crate::models::{DeletedItem, Item};

/// `LocalBackend` over `:memory:` that records calls, fails the ones it is
/// told to, and can hold a call in flight until released
pub(crate) struct FlakyApi {
    inner: LocalBackend,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    gates: Mutex<HashMap<&'static str, Arc<Notify>>>,
}

impl FlakyApi {
    pub async fn new() -> Self {
        Self {
            inner: LocalBackend::open(StoreConfig::in_memory()).await.unwrap(),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Store holding `names` as top-level items, in order
    pub async fn with_items(names: &[&str]) -> Self {
        let api = Self::new().await;
        for (index, name) in names.iter().enumerate() {
            api.inner
                .create_item(CreateItemArgs {
                    name: name.to_string(),
                    parent_id: None,
                    position: index as i32 + 1,
                })
                .await
                .unwrap();
        }
        api
    }

    /// Make every later `command` call fail with a transport error
    pub fn fail(&self, command: &'static str) {
        self.failing.lock().unwrap().insert(command);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Commands received so far, failed ones included
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// What the store holds right now, bypassing failure injection
    pub async fn stored(&self) -> Vec<Item> {
        self.inner.list_items().await.unwrap()
    }

    /// Hold the next `command` call until the returned gate is notified.
    /// Whether that call fails is decided when it arrives, before it waits.
    pub fn hold(&self, command: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(command, gate.clone());
        gate
    }

    async fn pass(&self, command: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(command);
        let fails = self.failing.lock().unwrap().contains(command);
        let gate = self.gates.lock().unwrap().remove(command);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if fails {
            return Err(ApiError::Transport(format!("{} unreachable", command)));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemApi for FlakyApi {
    async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        self.pass("list_items").await?;
        self.inner.list_items().await
    }

    async fn create_item(&self, args: CreateItemArgs) -> Result<Item, ApiError> {
        self.pass("create_item").await?;
        self.inner.create_item(args).await
    }

    async fn update_item(&self, id: u32, args: UpdateItemArgs) -> Result<Item, ApiError> {
        self.pass("update_item").await?;
        self.inner.update_item(id, args).await
    }

    async fn delete_item(&self, id: u32) -> Result<DeletedItem, ApiError> {
        self.pass("delete_item").await?;
        self.inner.delete_item(id).await
    }

    async fn move_item(&self, id: u32, args: MoveItemArgs) -> Result<Item, ApiError> {
        self.pass("move_item").await?;
        self.inner.move_item(id, args).await
    }

    async fn reorder_items(&self, args: ReorderArgs) -> Result<Vec<Item>, ApiError> {
        self.pass("reorder_items").await?;
        self.inner.reorder_items(args).await
    }

    async fn reset_items(&self) -> Result<Vec<Item>, ApiError> {
        self.pass("reset_items").await?;
        self.inner.reset_items().await
    }
}
