//! API server implementation.

use crate::error::ApiError;
use crate::routes;
use crate::state::AppState;
use axum::Router;
use regtoken_core::RegtokenConfig;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Serves the public API and, if configured, the admin API.
pub struct ApiServer {
    config: RegtokenConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: RegtokenConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the public application with its middleware.
    pub fn public_app(&self) -> Router {
        let app = routes::public_router(self.state.clone(), &self.config.base_url)
            .layer(TraceLayer::new_for_http());
        if self.config.allow_cors {
            app.layer(CorsLayer::permissive())
        } else {
            app
        }
    }

    pub fn admin_app(&self) -> Router {
        routes::admin_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Run until Ctrl+C.
    pub async fn run(&self) -> Result<(), ApiError> {
        let public_addr = self.config.public_bind();
        let public = bind(&public_addr).await?;
        tracing::info!(
            address = %public_addr,
            base_url = %self.config.base_url,
            "Serving registration API"
        );
        let public =
            axum::serve(public, self.public_app()).with_graceful_shutdown(shutdown_signal());

        match self.config.admin_bind.as_deref() {
            Some(admin_addr) => {
                let admin = bind(admin_addr).await?;
                tracing::info!(address = %admin_addr, "Serving token admin API");
                let admin =
                    axum::serve(admin, self.admin_app()).with_graceful_shutdown(shutdown_signal());

                let (public, admin) = tokio::join!(
                    async move { public.await },
                    async move { admin.await }
                );
                public
                    .and(admin)
                    .map_err(|e| ApiError::StartupFailed(e.to_string()))?;
            }
            None => {
                tracing::info!("Token admin API disabled");
                public
                    .await
                    .map_err(|e| ApiError::StartupFailed(e.to_string()))?;
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn bind(addr: &str) -> Result<TcpListener, ApiError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::StartupFailed(format!("{addr}: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
