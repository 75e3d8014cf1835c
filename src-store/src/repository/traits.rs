//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! Every write runs as a single transaction.

use async_trait::async_trait;

use crate::domain::{Deleted, DomainResult, Entity};

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Partial update payload
    type Patch: Send + Sync;

    /// Create a new entity; the stored id replaces whatever `entity` carries
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: T::Id) -> DomainResult<Option<T>>;

    /// List all entities
    async fn list(&self) -> DomainResult<Vec<T>>;

    /// Apply a partial update to an existing entity
    async fn update(&self, id: T::Id, patch: &Self::Patch) -> DomainResult<T>;

    /// Delete entity by ID
    async fn delete(&self, id: T::Id) -> DomainResult<Deleted<T::Id>>;
}
