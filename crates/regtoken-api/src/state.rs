//! Shared application state.

use crate::homeserver::Homeserver;
use regtoken_core::{CredentialRules, TokenDefaults};
use regtoken_tokens::TokenRegistry;
use std::sync::Arc;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    registry: Arc<TokenRegistry>,
    homeserver: Arc<dyn Homeserver>,
    credentials: CredentialRules,
    token_defaults: TokenDefaults,
}

impl AppState {
    pub fn new(
        registry: Arc<TokenRegistry>,
        homeserver: Arc<dyn Homeserver>,
        credentials: CredentialRules,
        token_defaults: TokenDefaults,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                registry,
                homeserver,
                credentials,
                token_defaults,
            }),
        }
    }

    /// The token registry.
    pub fn registry(&self) -> &TokenRegistry {
        &self.inner.registry
    }

    /// The homeserver accounts are created on.
    pub fn homeserver(&self) -> &dyn Homeserver {
        self.inner.homeserver.as_ref()
    }

    pub fn credentials(&self) -> &CredentialRules {
        &self.inner.credentials
    }

    /// Defaults for tokens created without explicit parameters.
    pub fn token_defaults(&self) -> &TokenDefaults {
        &self.inner.token_defaults
    }
}
