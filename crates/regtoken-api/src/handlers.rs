//! HTTP request handlers.

use crate::api_types::{CreateTokenRequest, RegisterRequest, RegisterResponse, UpdateTokenRequest};
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use regtoken_tokens::{TokenStatus, expiration};
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "regtoken",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Register an account with a registration token.
///
/// The token use is consumed before the homeserver is asked, and is not
/// given back if the homeserver then refuses.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if req.password != req.confirm {
        return Err(ApiError::PasswordMismatch);
    }
    state.credentials().check_username(&req.username)?;
    state.credentials().check_password(&req.password)?;

    let token = state.registry().redeem(&req.token, Utc::now()).await?;
    tracing::info!(
        token = %token.name(),
        usage_count = token.usage_count(),
        username = %req.username,
        "Registration token accepted"
    );

    match state.homeserver().register(&req.username, &req.password).await {
        Ok(account) => {
            tracing::info!(user_id = %account.user_id, token = %token.name(), "Account registered");
            Ok(Json(account.into()))
        }
        Err(e) => {
            tracing::warn!(
                token = %token.name(),
                username = %req.username,
                error = %e,
                "Registration failed after token use was consumed"
            );
            Err(e.into())
        }
    }
}

pub async fn list_tokens(State(state): State<AppState>) -> Json<Vec<TokenStatus>> {
    let now = Utc::now();
    let tokens = state.registry().list().await;
    Json(tokens.iter().map(|t| t.status(now)).collect())
}

pub async fn create_token(
    State(state): State<AppState>,
    Json(req): Json<CreateTokenRequest>,
) -> Result<(StatusCode, Json<TokenStatus>), ApiError> {
    let defaults = state.token_defaults();
    let now = Utc::now();

    let expression = req
        .expires
        .unwrap_or_else(|| defaults.default_expiration.clone());
    let expires_at = expiration::parse(&expression, now).into_result(&expression)?;
    let max_usage = req.max_usage.unwrap_or(defaults.default_maximum);

    let token = state.registry().create(expires_at, max_usage).await?;
    Ok((StatusCode::CREATED, Json(token.status(now))))
}

pub async fn get_token(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<TokenStatus>, ApiError> {
    let token = state
        .registry()
        .get(&name)
        .await
        .ok_or(ApiError::NotFound(name))?;
    Ok(Json(token.status(Utc::now())))
}

/// Disable a token. Tokens cannot be re-enabled.
pub async fn update_token(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<UpdateTokenRequest>,
) -> Result<Json<TokenStatus>, ApiError> {
    if !req.disabled {
        return Err(ApiError::InvalidParam(
            "tokens cannot be re-enabled".to_string(),
        ));
    }

    let registry = state.registry();
    let token = match registry.disable(&name).await? {
        Some(token) => token,
        None if registry.get(&name).await.is_some() => return Err(ApiError::Unchanged(name)),
        None => return Err(ApiError::NotFound(name)),
    };
    Ok(Json(token.status(Utc::now())))
}
