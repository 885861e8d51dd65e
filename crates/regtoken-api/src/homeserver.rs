//! Account creation on the homeserver.
//!
//! Accounts are created through Synapse's shared-secret registration
//! endpoint (`/_synapse/admin/v1/register`): fetch a nonce, then post the
//! credentials together with an HMAC-SHA1 over them keyed by the shared
//! secret.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::time::Duration;
use thiserror::Error;

const REGISTER_PATH: &str = "/_synapse/admin/v1/register";

/// Account details returned by the homeserver after registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredAccount {
    pub user_id: String,
    #[serde(default)]
    pub home_server: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Errors talking to the homeserver.
#[derive(Debug, Error)]
pub enum HomeserverError {
    /// The request never got a response.
    #[error("homeserver unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The homeserver answered with an error.
    #[error("homeserver rejected registration ({status}): {error}")]
    Rejected {
        status: u16,
        errcode: String,
        error: String,
    },

    /// The homeserver answered with something we could not read.
    #[error("unexpected homeserver response: {0}")]
    InvalidResponse(String),

    /// The shared secret could not key the MAC.
    #[error("invalid registration shared secret")]
    InvalidSecret,
}

/// Creates accounts on a homeserver.
#[async_trait]
pub trait Homeserver: Send + Sync {
    /// Register a regular (non-admin) user.
    async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<RegisteredAccount, HomeserverError>;
}

#[derive(Debug, Deserialize)]
struct NonceResponse {
    nonce: String,
}

#[derive(Debug, Serialize)]
struct SharedSecretRegistration<'a> {
    nonce: &'a str,
    username: &'a str,
    password: &'a str,
    admin: bool,
    mac: String,
}

#[derive(Debug, Deserialize)]
struct MatrixError {
    #[serde(default)]
    errcode: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Compute the shared-secret registration MAC.
///
/// HMAC-SHA1 over `nonce\0username\0password\0notadmin`, hex encoded.
pub fn registration_mac(
    shared_secret: &str,
    nonce: &str,
    username: &str,
    password: &str,
) -> Result<String, HomeserverError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(shared_secret.as_bytes())
        .map_err(|_| HomeserverError::InvalidSecret)?;
    mac.update(nonce.as_bytes());
    mac.update(b"\x00");
    mac.update(username.as_bytes());
    mac.update(b"\x00");
    mac.update(password.as_bytes());
    mac.update(b"\x00");
    mac.update(b"notadmin");
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Synapse shared-secret registration client.
#[derive(Debug, Clone)]
pub struct SynapseClient {
    client: reqwest::Client,
    register_url: String,
    shared_secret: String,
}

impl SynapseClient {
    /// Create a client for the homeserver at `server_location`.
    pub fn new(
        server_location: &str,
        shared_secret: impl Into<String>,
    ) -> Result<Self, HomeserverError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("regtoken/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            register_url: format!("{}{}", server_location.trim_end_matches('/'), REGISTER_PATH),
            shared_secret: shared_secret.into(),
        })
    }

    async fn fetch_nonce(&self) -> Result<String, HomeserverError> {
        let resp = self.client.get(&self.register_url).send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }

        let body: NonceResponse = resp
            .json()
            .await
            .map_err(|e| HomeserverError::InvalidResponse(e.to_string()))?;
        Ok(body.nonce)
    }
}

/// Turn an error response into [`HomeserverError::Rejected`].
async fn rejection(resp: reqwest::Response) -> HomeserverError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let parsed: Option<MatrixError> = serde_json::from_str(&body).ok();

    let (errcode, error) = match parsed {
        Some(MatrixError { errcode, error }) => (
            errcode.unwrap_or_else(|| "M_UNKNOWN".to_string()),
            error.unwrap_or_else(|| body.clone()),
        ),
        None => ("M_UNKNOWN".to_string(), body),
    };

    HomeserverError::Rejected {
        status: status.as_u16(),
        errcode,
        error,
    }
}

#[async_trait]
impl Homeserver for SynapseClient {
    async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<RegisteredAccount, HomeserverError> {
        let nonce = self.fetch_nonce().await?;
        let mac = registration_mac(&self.shared_secret, &nonce, username, password)?;

        let body = SharedSecretRegistration {
            nonce: &nonce,
            username,
            password,
            admin: false,
            mac,
        };

        let resp = self.client.post(&self.register_url).json(&body).send().await?;
        if !resp.status().is_success() {
            let err = rejection(resp).await;
            tracing::warn!(username, error = %err, "Homeserver refused registration");
            return Err(err);
        }

        let account: RegisteredAccount = resp
            .json()
            .await
            .map_err(|e| HomeserverError::InvalidResponse(e.to_string()))?;
        tracing::debug!(user_id = %account.user_id, "Homeserver created account");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_registration_mac() {
        let mac = registration_mac("shared-secret", "abc123", "alice", "correct horse").unwrap();
        assert_eq!(mac, "d1edef3760cadcb519699eb683cf7284ae6a39c4");
    }

    #[tokio::test]
    async fn test_register_sends_nonce_and_mac() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(REGISTER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nonce": "abc123"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .and(body_partial_json(json!({
                "nonce": "abc123",
                "username": "alice",
                "admin": false,
                "mac": "d1edef3760cadcb519699eb683cf7284ae6a39c4",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_id": "@alice:example.org",
                "home_server": "example.org",
                "access_token": "syt_abc",
                "device_id": "DEVICE",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SynapseClient::new(&format!("{}/", server.uri()), "shared-secret").unwrap();
        let account = client.register("alice", "correct horse").await.unwrap();

        assert_eq!(account.user_id, "@alice:example.org");
        assert_eq!(account.home_server.as_deref(), Some("example.org"));
        assert_eq!(account.device_id.as_deref(), Some("DEVICE"));
    }

    #[tokio::test]
    async fn test_rejection_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(REGISTER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nonce": "n"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REGISTER_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errcode": "M_USER_IN_USE",
                "error": "User ID already taken.",
            })))
            .mount(&server)
            .await;

        let client = SynapseClient::new(&server.uri(), "secret").unwrap();
        let err = client.register("taken", "password1").await.unwrap_err();

        match err {
            HomeserverError::Rejected {
                status,
                errcode,
                error,
            } => {
                assert_eq!(status, 400);
                assert_eq!(errcode, "M_USER_IN_USE");
                assert_eq!(error, "User ID already taken.");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(REGISTER_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = SynapseClient::new(&server.uri(), "secret").unwrap();
        let err = client.register("alice", "password1").await.unwrap_err();

        assert!(matches!(
            err,
            HomeserverError::Rejected { status: 503, ref errcode, ref error }
                if errcode == "M_UNKNOWN" && error == "upstream down"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_homeserver() {
        let client = SynapseClient::new("http://127.0.0.1:1", "secret").unwrap();
        let err = client.register("alice", "password1").await.unwrap_err();
        assert!(matches!(err, HomeserverError::Transport(_)));
    }
}
