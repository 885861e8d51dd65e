//! Route definitions.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};

/// Router for the public listener: health check and registration.
///
/// When `base_url` is set (e.g. `/matrix`) the routes are served under it.
pub fn public_router(state: AppState, base_url: &str) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/register", post(handlers::register))
        .with_state(state);

    let base_url = base_url.trim_end_matches('/');
    if base_url.is_empty() {
        routes
    } else {
        Router::new().nest(base_url, routes)
    }
}

/// Router for the admin listener: token management.
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/token",
            get(handlers::list_tokens).post(handlers::create_token),
        )
        .route(
            "/api/token/{name}",
            get(handlers::get_token).patch(handlers::update_token),
        )
        .with_state(state)
}
