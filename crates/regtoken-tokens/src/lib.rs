//! # regtoken-tokens
//!
//! Registration token lifecycle for regtoken.
//!
//! This crate provides:
//! - Parsing expiration expressions (`never`, `day`, `week`, `month`, `YYYY-MM-DD`)
//! - The [`Token`] entity and its validity rules
//! - The [`TokenRegistry`], which creates, redeems and disables tokens
//! - Storage backends behind the [`TokenStore`] trait (memory, JSON Lines, SQLite)
//!
//! ## Token Validity
//!
//! A token is **active** when all of the following hold:
//!
//! | Condition | Fails when |
//! |-----------|------------|
//! | not disabled | an administrator disabled it |
//! | not expired | `now >= expires_at` |
//! | not exhausted | `max_usage > 0 && usage_count >= max_usage` |
//!
//! Redemption checks and consumes a use atomically: of several concurrent
//! redemptions of a single-use token, exactly one succeeds.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use regtoken_tokens::{expiration, MemoryStore, TokenRegistry};
//! use chrono::Utc;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = TokenRegistry::hydrate(Arc::new(MemoryStore::new())).await?;
//!
//! let expires_at = expiration::parse("week", Utc::now()).into_result("week")?;
//! let token = registry.create(expires_at, 1).await?;
//!
//! registry.redeem(token.name(), Utc::now()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod expiration;
pub mod name;
pub mod registry;
pub mod store;
pub mod token;

pub use error::{ExpirationError, StoreError, TokenError};
pub use expiration::{Expiration, ExpirationKeyword};
pub use name::{NameGenerator, RandomNameGenerator};
pub use registry::TokenRegistry;
pub use store::{FileStore, MemoryStore, SqliteStore, TokenStore, create_store};
pub use token::{Token, TokenRecord, TokenStatus};
