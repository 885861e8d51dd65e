//! In-memory token storage.

use super::TokenStore;
use crate::error::StoreError;
use crate::token::Token;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::RwLock;

/// Keeps tokens in process memory. Useful for tests and throwaway setups.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tokens: RwLock<IndexMap<String, Token>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `tokens`, as if persisted by an earlier run.
    pub fn with_tokens(tokens: impl IntoIterator<Item = Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .map(|token| (token.name().to_string(), token))
            .collect();
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    /// Copy of everything stored, in insertion order.
    pub fn snapshot(&self) -> Vec<Token> {
        self.tokens
            .read()
            .map(|tokens| tokens.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<Token>, StoreError> {
        let tokens = self.tokens.read().map_err(|_| StoreError::LockError)?;
        Ok(tokens.values().cloned().collect())
    }

    async fn upsert(&self, token: &Token) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().map_err(|_| StoreError::LockError)?;
        let stored = match tokens.get(token.name()) {
            Some(existing) => existing.merged_with(token),
            None => token.clone(),
        };
        tokens.insert(token.name().to_string(), stored);
        Ok(())
    }
}
