//! Store Configuration
//!
//! Loaded from a JSON file; every field has a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult, SeedItem};

pub const DEFAULT_DB_FILE: &str = "tasktree.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file, or `:memory:`
    pub db_path: PathBuf,
    /// Directory for rolling log files; logging stays off when unset
    pub log_dir: Option<PathBuf>,
    /// Write `seed_items` when the store opens empty
    pub seed_on_empty: bool,
    /// Default item set written by a reset
    pub seed_items: Vec<SeedItem>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_dir: None,
            seed_on_empty: true,
            seed_items: default_seed(),
        }
    }
}

impl StoreConfig {
    /// Read a JSON config file
    pub fn load(path: &Path) -> DomainResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Internal(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            DomainError::Validation(format!("Invalid config {}: {}", path.display(), e))
        })
    }

    /// Private in-memory database, no seeding
    pub fn in_memory() -> Self {
        Self {
            db_path: PathBuf::from(":memory:"),
            seed_on_empty: false,
            ..Self::default()
        }
    }
}

fn default_seed() -> Vec<SeedItem> {
    vec![
        SeedItem {
            name: "Welcome to tasktree".to_string(),
            children: vec![
                SeedItem::leaf("Click an item to complete it"),
                SeedItem::leaf("Drag items to reorder them"),
            ],
        },
        SeedItem::leaf("Add your first task"),
    ]
}
