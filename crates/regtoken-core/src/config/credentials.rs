//! Username and password requirements for new accounts.

use super::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Username requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameConfig {
    /// Patterns the localpart must match (all of them).
    #[serde(default = "default_validation_regex")]
    pub validation_regex: Vec<String>,

    /// Maximum localpart length in bytes.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for UsernameConfig {
    fn default() -> Self {
        Self {
            validation_regex: default_validation_regex(),
            max_length: default_max_length(),
        }
    }
}

fn default_validation_regex() -> Vec<String> {
    // Characters the Matrix spec allows in a user localpart
    vec![r"^[a-z0-9._=/\-]+$".to_string()]
}

fn default_max_length() -> usize {
    255
}

/// Password requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Minimum password length in characters.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
        }
    }
}

fn default_min_length() -> usize {
    8
}

/// A credential that does not meet the configured requirements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("username '{0}' is not allowed")]
    InvalidUsername(String),

    #[error("password must be at least {min_length} characters long")]
    WeakPassword { min_length: usize },
}

/// Compiled credential requirements.
#[derive(Debug, Clone)]
pub struct CredentialRules {
    username_patterns: Vec<Regex>,
    username_max_length: usize,
    password_min_length: usize,
}

impl CredentialRules {
    /// Compile the configured requirements.
    pub fn new(username: &UsernameConfig, password: &PasswordConfig) -> Result<Self, ConfigError> {
        let username_patterns = username
            .validation_regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Invalid(format!("invalid username regex '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            username_patterns,
            username_max_length: username.max_length,
            password_min_length: password.min_length,
        })
    }

    /// Check a requested username (localpart).
    pub fn check_username(&self, username: &str) -> Result<(), CredentialError> {
        if username.is_empty()
            || username.len() > self.username_max_length
            || !self.username_patterns.iter().all(|re| re.is_match(username))
        {
            return Err(CredentialError::InvalidUsername(username.to_string()));
        }
        Ok(())
    }

    /// Check a requested password.
    pub fn check_password(&self, password: &str) -> Result<(), CredentialError> {
        if password.chars().count() < self.password_min_length {
            return Err(CredentialError::WeakPassword {
                min_length: self.password_min_length,
            });
        }
        Ok(())
    }
}
