//! `regtoken serve` - Start the registration API.

use anyhow::Context;
use chrono::Utc;
use regtoken_api::{ApiServer, AppState, SynapseClient};
use regtoken_core::RegtokenConfig;
use regtoken_tokens::{TokenRegistry, expiration};
use std::sync::Arc;

pub async fn run(registry: Arc<TokenRegistry>, config: RegtokenConfig) -> anyhow::Result<()> {
    config
        .validate_for_serve()
        .context("Invalid configuration for serve")?;

    let default_expiration = &config.tokens.default_expiration;
    expiration::parse(default_expiration, Utc::now())
        .into_result(default_expiration)
        .context("Invalid tokens.default_expiration")?;

    let credentials = config.credential_rules()?;
    let secret = config
        .shared_secret()
        .context("Registration shared secret is not set")?;
    let homeserver = SynapseClient::new(&config.server_location, secret)
        .context("Failed to create homeserver client")?;

    tracing::info!(
        server_location = %config.server_location,
        tokens = registry.list().await.len(),
        "Starting regtoken"
    );

    let state = AppState::new(
        registry,
        Arc::new(homeserver),
        credentials,
        config.tokens.clone(),
    );
    ApiServer::new(config, state).run().await?;
    Ok(())
}
