//! `regtoken status` - Inspect, list or disable tokens.

use chrono::{DateTime, Utc};
use regtoken_tokens::{Token, TokenRegistry};

/// What `status` was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusAction {
    Show(String),
    List,
    Disable(String),
}

pub async fn run(registry: &TokenRegistry, action: StatusAction) -> anyhow::Result<()> {
    let output = match action {
        StatusAction::Disable(name) => {
            if registry.disable(&name).await?.is_some() {
                "Token disabled".to_string()
            } else {
                "Token couldn't be disabled".to_string()
            }
        }
        StatusAction::Show(name) => match registry.get(&name).await {
            Some(token) => show(&token, Utc::now())?,
            None => "No token with that name".to_string(),
        },
        StatusAction::List => list(&registry.list().await, Utc::now()),
    };

    println!("{output}");
    Ok(())
}

/// Validity line followed by the status as pretty JSON.
pub fn show(token: &Token, now: DateTime<Utc>) -> anyhow::Result<String> {
    let status = token.status(now);
    let validity = if status.active {
        "This token is valid"
    } else {
        "This token is not valid"
    };
    Ok(format!(
        "{validity}\n{}",
        serde_json::to_string_pretty(&status)?
    ))
}

/// One line per token, in creation order.
pub fn list(tokens: &[Token], now: DateTime<Utc>) -> String {
    if tokens.is_empty() {
        return "No tokens".to_string();
    }

    tokens
        .iter()
        .map(|token| {
            let state = if token.is_disabled() {
                "disabled"
            } else if token.is_active(now) {
                "active"
            } else {
                "inactive"
            };
            let uses = match token.max_usage() {
                0 => format!("{}/unlimited", token.usage_count()),
                max => format!("{}/{}", token.usage_count(), max),
            };
            let expires = token
                .expires_at()
                .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string());

            format!("{}  {:<8}  uses {:<14}  expires {}", token.name(), state, uses, expires)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
