//! The registration token entity.
//!
//! A [`Token`] only answers questions about itself. Its fields change through
//! the [`TokenRegistry`](crate::TokenRegistry), which persists every change
//! before it becomes visible.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One issued registration token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TokenRecord", into = "TokenRecord")]
pub struct Token {
    name: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    max_usage: u32,
    usage_count: u32,
    disabled: bool,
}

impl Token {
    /// A fresh token: unused and enabled.
    pub(crate) fn issue(
        name: String,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        max_usage: u32,
    ) -> Self {
        Self {
            name,
            created_at,
            expires_at,
            max_usage,
            usage_count: 0,
            disabled: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the token stops working. `None` means never.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Maximum number of uses. `0` means unlimited.
    pub fn max_usage(&self) -> u32 {
        self.max_usage
    }

    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_usage != 0 && self.usage_count >= self.max_usage
    }

    /// Whether the token can be redeemed at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.disabled && !self.is_expired(now) && !self.is_exhausted()
    }

    /// Uses left before the cap. `None` when unlimited.
    pub fn remaining_uses(&self) -> Option<u32> {
        (self.max_usage != 0).then(|| self.max_usage.saturating_sub(self.usage_count))
    }

    /// Status record for display.
    pub fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        TokenStatus {
            name: self.name.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            max_usage: self.max_usage,
            usage_count: self.usage_count,
            remaining_uses: self.remaining_uses(),
            disabled: self.disabled,
            active: self.is_active(now),
        }
    }

    /// The token after one more use.
    pub(crate) fn with_use(&self) -> Self {
        Self {
            usage_count: self.usage_count.saturating_add(1),
            ..self.clone()
        }
    }

    pub(crate) fn with_disabled(&self) -> Self {
        Self {
            disabled: true,
            ..self.clone()
        }
    }

    /// Fold a later write of this token into the stored copy.
    ///
    /// The usage count never goes down and a disabled token stays disabled,
    /// even when `later` was written from a stale copy by another process.
    pub fn merged_with(&self, later: &Token) -> Self {
        Self {
            usage_count: self.usage_count.max(later.usage_count),
            disabled: self.disabled || later.disabled,
            ..later.clone()
        }
    }
}

/// Plain persisted form of a [`Token`].
///
/// Store implementations read and write this shape; converting it back into
/// a [`Token`] checks the invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_usage: u32,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default)]
    pub disabled: bool,
}

impl TryFrom<TokenRecord> for Token {
    type Error = StoreError;

    fn try_from(record: TokenRecord) -> Result<Self, Self::Error> {
        if record.name.is_empty() {
            return Err(StoreError::Corrupt("token name is empty".to_string()));
        }
        if record.max_usage != 0 && record.usage_count > record.max_usage {
            return Err(StoreError::Corrupt(format!(
                "token {} used {} times, more than its maximum of {}",
                record.name, record.usage_count, record.max_usage
            )));
        }

        Ok(Self {
            name: record.name,
            created_at: record.created_at,
            expires_at: record.expires_at,
            max_usage: record.max_usage,
            usage_count: record.usage_count,
            disabled: record.disabled,
        })
    }
}

impl From<Token> for TokenRecord {
    fn from(token: Token) -> Self {
        Self {
            name: token.name,
            created_at: token.created_at,
            expires_at: token.expires_at,
            max_usage: token.max_usage,
            usage_count: token.usage_count,
            disabled: token.disabled,
        }
    }
}

/// Point-in-time view of a token, including whether it is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatus {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_usage: u32,
    pub usage_count: u32,
    pub remaining_uses: Option<u32>,
    pub disabled: bool,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn token(expires_at: Option<DateTime<Utc>>, max_usage: u32) -> Token {
        Token::issue("abc".to_string(), now(), expires_at, max_usage)
    }

    #[test]
    fn test_fresh_token_is_active() {
        let token = token(None, 0);
        assert!(token.is_active(now()));
        assert_eq!(token.usage_count(), 0);
        assert!(!token.is_disabled());
        assert_eq!(token.remaining_uses(), None);
    }

    #[test]
    fn test_disabled_is_never_active() {
        let token = token(Some(now() + Duration::days(1)), 5).with_disabled();
        assert!(!token.is_active(now()));
        assert!(!token.is_active(now() - Duration::days(365)));
    }

    #[test]
    fn test_stale_write_cannot_undo_use_or_disable() {
        let stored = token(None, 3).with_use().with_use().with_disabled();
        let stale = token(None, 3).with_use();

        let merged = stored.merged_with(&stale);
        assert_eq!(merged.usage_count(), 2);
        assert!(merged.is_disabled());

        // A newer write still moves the count forward
        let newer = token(None, 3).with_use().with_use().with_use();
        assert_eq!(merged.merged_with(&newer).usage_count(), 3);
    }

    #[test]
    fn test_expiry_boundary() {
        let expires = now() + Duration::seconds(1);
        let token = token(Some(expires), 0);
        assert!(token.is_active(now()));
        assert!(!token.is_active(expires));
        assert!(!token.is_active(expires + Duration::seconds(1)));
    }

    #[test]
    fn test_usage_cap() {
        let token = token(None, 2);
        assert_eq!(token.remaining_uses(), Some(2));

        let token = token.with_use();
        assert!(token.is_active(now()));
        assert_eq!(token.remaining_uses(), Some(1));

        let token = token.with_use();
        assert!(token.is_exhausted());
        assert!(!token.is_active(now()));
        assert_eq!(token.remaining_uses(), Some(0));
    }

    #[test]
    fn test_unlimited_usage() {
        let mut token = token(None, 0);
        for _ in 0..100 {
            token = token.with_use();
        }
        assert!(token.is_active(now()));
        assert_eq!(token.usage_count(), 100);
        assert_eq!(token.remaining_uses(), None);
    }

    #[test]
    fn test_status() {
        let expires = now() + Duration::days(7);
        let status = token(Some(expires), 3).with_use().status(now());

        assert_eq!(status.name, "abc");
        assert_eq!(status.expires_at, Some(expires));
        assert_eq!(status.max_usage, 3);
        assert_eq!(status.usage_count, 1);
        assert_eq!(status.remaining_uses, Some(2));
        assert!(!status.disabled);
        assert!(status.active);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["name"], "abc");
        assert_eq!(json["active"], true);
    }

    #[test]
    fn test_status_never_expires_is_null() {
        let json = serde_json::to_value(token(None, 0).status(now())).unwrap();
        assert!(json["expires_at"].is_null());
        assert!(json["remaining_uses"].is_null());
    }

    #[test]
    fn test_serde_checks_invariants() {
        let token = token(None, 1).with_use();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(serde_json::from_str::<Token>(&json).unwrap(), token);

        let overused = r#"{"name":"x","created_at":"2024-06-01T12:00:00Z","max_usage":1,"usage_count":2}"#;
        assert!(serde_json::from_str::<Token>(overused).is_err());

        let unnamed = r#"{"name":"","created_at":"2024-06-01T12:00:00Z"}"#;
        assert!(serde_json::from_str::<Token>(unnamed).is_err());
    }
}
