//! Tasktree Store
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - repository: Data access abstractions and implementations
//! - commands: Transport-facing handlers
//! - config: Store configuration

pub mod commands;
pub mod config;
pub mod domain;
pub mod repository;

use config::StoreConfig;
use domain::{DomainError, DomainResult};
use repository::{init_db, DbState, ItemMaintenanceOperations, ItemRepository};

const APP_NAME: &str = "tasktree";

/// Application state shared across commands
pub struct AppState {
    pub db_state: DbState,
    pub item_repo: ItemRepository,
    pub config: StoreConfig,
}

/// Open the store described by `config`: logging, database, first-run seed.
pub async fn init(config: StoreConfig) -> DomainResult<AppState> {
    if let Some(log_dir) = &config.log_dir {
        match rolling_logger::init_logger(log_dir.clone(), APP_NAME) {
            Ok(()) | Err(rolling_logger::LoggerError::AlreadyInitialized) => {}
            Err(e) => return Err(DomainError::Internal(format!("Failed to init logger: {}", e))),
        }
    }

    log::info!("Opening item store at {}", config.db_path.display());
    let db_state = init_db(&config.db_path).await?;
    let item_repo = ItemRepository::new(db_state.connection());

    if config.seed_on_empty && item_repo.is_empty().await? {
        item_repo.reset(&config.seed_items).await?;
    }

    let _ = rolling_logger::info("Item store ready");

    Ok(AppState {
        db_state,
        item_repo,
        config,
    })
}
