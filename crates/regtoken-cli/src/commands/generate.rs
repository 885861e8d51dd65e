//! `regtoken generate` - Generate a new registration token.

use chrono::Utc;
use regtoken_core::RegtokenConfig;
use regtoken_tokens::{Token, TokenRegistry, expiration};

/// Create a token and print how to use it.
///
/// `maximum` and `expires` fall back to the configured token defaults.
pub async fn run(
    registry: &TokenRegistry,
    config: &RegtokenConfig,
    maximum: Option<u32>,
    expires: Option<&str>,
) -> anyhow::Result<()> {
    let maximum = maximum.unwrap_or(config.tokens.default_maximum);
    let expires = expires.unwrap_or(config.tokens.default_expiration.as_str());

    let expires_at = expiration::parse(expires, Utc::now()).into_result(expires)?;
    let token = registry.create(expires_at, maximum).await?;

    println!("{}", describe(&token, &config.registration_url));
    Ok(())
}

/// Human readable summary of a freshly generated token.
pub fn describe(token: &Token, registration_url: &str) -> String {
    let mut lines = vec![format!("Token generated: {}", token.name())];

    if token.max_usage() != 0 {
        lines.push(format!("With maximum usage: {}", token.max_usage()));
    } else {
        lines.push("With no maximum usage".to_string());
    }

    match token.expires_at() {
        Some(at) => lines.push(format!("Expires at: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))),
        None => lines.push("Never expires".to_string()),
    }

    lines.push(format!(
        "URL: {}/register?token={}",
        registration_url.trim_end_matches('/'),
        token.name()
    ));
    lines.join("\n")
}
