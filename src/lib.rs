/// Public library interface for the daily habit tracker
///
/// This module exports the habit data service, the storage backends behind
/// it and the domain types they exchange.

use thiserror::Error;

// Internal modules
mod domain;
mod storage;
mod repository;
mod service;
pub mod config;
pub mod diagnostics;

// Re-export public modules and types
pub use domain::*;
pub use storage::{
    FileKeyValueStore, HabitStorage, KeyValueStorage, KeyValueStore, MemoryKeyValueStore,
    SqliteStorage, StorageBackend, StorageDiagnostics, StorageError,
};
pub use repository::HabitRepository;
pub use service::HabitService;
pub use config::{BackendKind, ConfigError, TrackerConfig};

/// Errors returned by the habit service
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Storage(#[from] storage::StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
