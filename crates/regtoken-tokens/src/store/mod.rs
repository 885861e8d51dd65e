//! Token storage backends.
//!
//! The registry loads every token once at startup and writes each changed
//! token back through [`TokenStore::upsert`] before the change takes effect.

mod file;
mod memory;
mod sqlite;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::token::Token;
use async_trait::async_trait;
use regtoken_core::config::{StorageBackend, StorageConfig};
use std::sync::Arc;

/// Trait for token storage backends.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load every stored token, oldest first.
    async fn load_all(&self) -> Result<Vec<Token>, StoreError>;

    /// Insert or replace a token. Must not return before the write is durable.
    async fn upsert(&self, token: &Token) -> Result<(), StoreError>;
}

/// Create a storage backend based on configuration.
pub async fn create_store(config: &StorageConfig) -> Result<Arc<dyn TokenStore>, StoreError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Memory storage selected, tokens will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::File => Ok(Arc::new(FileStore::open(&config.path)?)),
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.path).await?)),
    }
}
