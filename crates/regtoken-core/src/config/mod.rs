//! Configuration types for regtoken.
//!
//! A single YAML file (`config.yaml` by default) configures the homeserver
//! connection, the HTTP listeners, token storage, token defaults used by the
//! CLI, credential requirements for new accounts, and logging.
//!
//! # Resolution
//!
//! 1. An explicit path (the CLI `--config-path` flag)
//! 2. The `REGTOKEN_CONFIG` environment variable
//! 3. `config.yaml` in the working directory
//!
//! A missing default file falls back to built-in defaults; an explicitly
//! requested file that does not exist is an error.

pub mod credentials;
pub mod logging;
pub mod storage;
pub mod tokens;

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use credentials::{CredentialError, CredentialRules, PasswordConfig, UsernameConfig};
pub use logging::{LogFormat, LoggingConfig};
pub use storage::{StorageBackend, StorageConfig};
pub use tokens::TokenDefaults;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "REGTOKEN_CONFIG";

/// Configuration file used when nothing else is specified.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Complete regtoken configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegtokenConfig {
    /// Base URL of the homeserver accounts are registered on.
    #[serde(default = "default_server_location")]
    pub server_location: String,

    /// Shared secret for the homeserver registration admin API.
    #[serde(default)]
    pub registration_shared_secret: Option<String>,

    /// Environment variable containing the shared secret (takes precedence).
    #[serde(default)]
    pub registration_shared_secret_env: Option<String>,

    /// Public URL of the registration page, printed alongside new tokens.
    #[serde(default = "default_registration_url")]
    pub registration_url: String,

    /// Host the public API binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the public API listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL prefix for the public API (e.g. "/matrix-registration").
    #[serde(default)]
    pub base_url: String,

    /// Bind address of the token administration API. Disabled when absent.
    #[serde(default = "default_admin_bind")]
    pub admin_bind: Option<String>,

    /// Whether to answer cross-origin requests on the public API.
    #[serde(default)]
    pub allow_cors: bool,

    /// Token storage backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Defaults for newly generated tokens.
    #[serde(default)]
    pub tokens: TokenDefaults,

    /// Username requirements.
    #[serde(default)]
    pub username: UsernameConfig,

    /// Password requirements.
    #[serde(default)]
    pub password: PasswordConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RegtokenConfig {
    fn default() -> Self {
        Self {
            server_location: default_server_location(),
            registration_shared_secret: None,
            registration_shared_secret_env: None,
            registration_url: default_registration_url(),
            host: default_host(),
            port: default_port(),
            base_url: String::new(),
            admin_bind: default_admin_bind(),
            allow_cors: false,
            storage: StorageConfig::default(),
            tokens: TokenDefaults::default(),
            username: UsernameConfig::default(),
            password: PasswordConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_server_location() -> String {
    "http://localhost:8008".to_string()
}

fn default_registration_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_admin_bind() -> Option<String> {
    Some("127.0.0.1:5001".to_string())
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

impl RegtokenConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Resolve the configuration file and load it.
    ///
    /// See the module docs for the resolution order.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(p) = env::var(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(p));
        }

        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(
                path = %path.display(),
                "No configuration file found, using defaults"
            );
            Ok(Self::default())
        }
    }

    /// Get the registration shared secret, checking the env var first.
    pub fn shared_secret(&self) -> Option<String> {
        if let Some(env_var) = &self.registration_shared_secret_env
            && let Ok(secret) = env::var(env_var)
        {
            return Some(secret);
        }
        self.registration_shared_secret.clone()
    }

    /// Address of the public API listener.
    pub fn public_bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Compile the username and password requirements.
    pub fn credential_rules(&self) -> Result<CredentialRules, ConfigError> {
        CredentialRules::new(&self.username, &self.password)
    }

    /// Check the settings `serve` depends on.
    pub fn validate_for_serve(&self) -> Result<(), ConfigError> {
        if self.server_location.trim().is_empty() {
            return Err(ConfigError::Invalid("server_location is empty".to_string()));
        }
        if self.shared_secret().is_none_or(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "registration shared secret is not set (registration_shared_secret or registration_shared_secret_env)"
                    .to_string(),
            ));
        }
        if !self.base_url.is_empty() && !self.base_url.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with '/': {}",
                self.base_url
            )));
        }
        self.credential_rules()?;
        Ok(())
    }
}
