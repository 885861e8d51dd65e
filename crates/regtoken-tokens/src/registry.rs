//! The token registry.
//!
//! The registry owns every [`Token`] and is the only place they change.
//! All mutations run inside one critical section that spans the check, the
//! durable write and the in-memory commit, so:
//!
//! - two concurrent redemptions of a single-use token cannot both succeed;
//! - a failed write leaves the registry exactly as it was;
//! - nothing is reported as done before the store acknowledged it.

use crate::error::{StoreError, TokenError};
use crate::name::{NameGenerator, RandomNameGenerator};
use crate::store::TokenStore;
use crate::token::Token;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Candidate names tried before `create` gives up.
const MAX_NAME_ATTEMPTS: usize = 32;

/// Registry of registration tokens backed by a [`TokenStore`].
pub struct TokenRegistry {
    /// Tokens keyed by name, in creation order.
    tokens: Mutex<IndexMap<String, Token>>,
    store: Arc<dyn TokenStore>,
    names: Box<dyn NameGenerator>,
}

impl TokenRegistry {
    /// Build the registry from everything the store holds.
    ///
    /// Recovered tokens keep their usage counts and disabled flags.
    pub async fn hydrate(store: Arc<dyn TokenStore>) -> Result<Self, StoreError> {
        let loaded = store.load_all().await?;

        let mut tokens = IndexMap::with_capacity(loaded.len());
        for token in loaded {
            tokens.insert(token.name().to_string(), token);
        }
        tracing::info!(count = tokens.len(), "Loaded tokens from storage");

        Ok(Self {
            tokens: Mutex::new(tokens),
            store,
            names: Box::new(RandomNameGenerator::default()),
        })
    }

    /// Replace the name generator.
    pub fn with_name_generator(mut self, names: impl NameGenerator + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    /// Issue a new token.
    pub async fn create(
        &self,
        expires_at: Option<DateTime<Utc>>,
        max_usage: u32,
    ) -> Result<Token, TokenError> {
        let mut tokens = self.tokens.lock().await;

        let name = (0..MAX_NAME_ATTEMPTS)
            .map(|_| self.names.generate())
            .find(|candidate| {
                let free = !candidate.is_empty() && !tokens.contains_key(candidate);
                if !free {
                    tracing::debug!("Token name unusable, regenerating");
                }
                free
            })
            .ok_or(TokenError::NameUnavailable(MAX_NAME_ATTEMPTS))?;

        let token = Token::issue(name, Utc::now(), expires_at, max_usage);
        self.store.upsert(&token).await?;
        tokens.insert(token.name().to_string(), token.clone());

        tracing::info!(
            token = %token.name(),
            max_usage,
            expires_at = ?expires_at,
            "Token created"
        );
        Ok(token)
    }

    /// Look up a token by name.
    pub async fn get(&self, name: &str) -> Option<Token> {
        self.tokens.lock().await.get(name).cloned()
    }

    /// Consume one use of a token.
    ///
    /// Returns the token as it is after this use.
    pub async fn redeem(&self, name: &str, now: DateTime<Utc>) -> Result<Token, TokenError> {
        let mut tokens = self.tokens.lock().await;

        let current = tokens
            .get(name)
            .ok_or_else(|| TokenError::NotFound(name.to_string()))?;

        if !current.is_active(now) {
            tracing::debug!(
                token = %name,
                disabled = current.is_disabled(),
                expired = current.is_expired(now),
                exhausted = current.is_exhausted(),
                "Rejected redemption of inactive token"
            );
            return Err(TokenError::NotActive(name.to_string()));
        }

        let updated = current.with_use();
        self.store.upsert(&updated).await?;
        tokens.insert(name.to_string(), updated.clone());

        tracing::debug!(
            token = %name,
            usage_count = updated.usage_count(),
            "Token redeemed"
        );
        Ok(updated)
    }

    /// Disable a token.
    ///
    /// Returns the disabled token, or `None` if the token does not exist or
    /// was already disabled.
    pub async fn disable(&self, name: &str) -> Result<Option<Token>, TokenError> {
        let mut tokens = self.tokens.lock().await;

        let updated = match tokens.get(name) {
            Some(token) if !token.is_disabled() => token.with_disabled(),
            _ => return Ok(None),
        };

        self.store.upsert(&updated).await?;
        tokens.insert(name.to_string(), updated.clone());

        tracing::info!(token = %name, "Token disabled");
        Ok(Some(updated))
    }

    /// All tokens in creation order.
    pub async fn list(&self) -> Vec<Token> {
        self.tokens.lock().await.values().cloned().collect()
    }
}
