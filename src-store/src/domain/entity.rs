//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique ID and be thread-safe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
///
/// Serializable so a transport can forward the kind and message unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "message")]
pub enum DomainError {
    /// Rejected input (empty name, non-positive position, cyclic move)
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// Insert or move target outside the sibling group's range
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sibling_order::PositionError> for DomainError {
    fn from(err: sibling_order::PositionError) -> Self {
        DomainError::InvalidPosition(err.to_string())
    }
}

/// Marker returned by a delete, naming the deleted root and the subtree size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted<Id> {
    pub id: Id,
    /// Rows removed, including the item itself
    pub removed: usize,
}
