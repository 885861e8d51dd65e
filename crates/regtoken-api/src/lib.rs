//! # regtoken-api
//!
//! HTTP surface of regtoken.
//!
//! Two listeners are served:
//!
//! | Listener | Routes | Audience |
//! |----------|--------|----------|
//! | public (`host:port`, under `base_url`) | `GET /health`, `POST /api/register` | anyone holding a token |
//! | admin (`admin_bind`, loopback by default) | `GET/POST /api/token`, `GET/PATCH /api/token/{name}` | operators |
//!
//! Errors are JSON bodies of the form `{"errcode": "M_...", "error": "..."}`.
//!
//! Accounts are created on the homeserver through the [`Homeserver`] trait;
//! [`SynapseClient`] implements it with Synapse shared-secret registration.

pub mod api_types;
pub mod error;
pub mod handlers;
pub mod homeserver;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use homeserver::{Homeserver, HomeserverError, RegisteredAccount, SynapseClient};
pub use server::ApiServer;
pub use state::AppState;
