//! # regtoken-core
//!
//! Configuration types shared by the regtoken crates.

// Configuration types shared across all regtoken crates
pub mod config;

// Re-export commonly used config types for convenience
pub use config::{
    ConfigError, CredentialError, CredentialRules, LogFormat, LoggingConfig, PasswordConfig,
    RegtokenConfig, StorageBackend, StorageConfig, TokenDefaults, UsernameConfig,
};
