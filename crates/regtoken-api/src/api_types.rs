//! Request and response bodies.

use crate::homeserver::RegisteredAccount;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/register`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm: String,
    pub token: String,
}

/// Successful registration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl From<RegisteredAccount> for RegisterResponse {
    fn from(account: RegisteredAccount) -> Self {
        Self {
            user_id: account.user_id,
            home_server: account.home_server,
            access_token: account.access_token,
            device_id: account.device_id,
        }
    }
}

/// Body of `POST /api/token`. Missing fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateTokenRequest {
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default)]
    pub max_usage: Option<u32>,
}

/// Body of `PATCH /api/token/{name}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdateTokenRequest {
    pub disabled: bool,
}
