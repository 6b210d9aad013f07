//! REST calls against the remote authentication service.
//!
//! `AuthApi` is the seam the session core talks through; `HttpAuthApi` is the
//! `reqwest` implementation. The HTTP client keeps a cookie store, so the
//! session cookie set by a successful login rides along on later lookups.
//!
//! ERROR HANDLING
//! ==============
//! Status codes are classified here and nowhere else: any non-2xx identity
//! lookup is `Unauthenticated`, any non-2xx login is `Rejected` with its body.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use crate::config::ClientConfig;
use crate::error::{ConfigError, FetchError, LoginError};

use super::types::{Identity, LoginPayload};

pub const ME_PATH: &str = "/api/users/me";
pub const LOGIN_PATH: &str = "/api/users/login";

/// The remote authentication collaborator.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// `GET /api/users/me`.
    async fn fetch_me(&self) -> Result<Identity, FetchError>;

    /// `POST /api/users/login`. The success body is ignored.
    async fn login(&self, payload: &LoginPayload) -> Result<(), LoginError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

pub struct HttpAuthApi {
    http: reqwest::Client,
    me_url: String,
    login_url: String,
}

impl HttpAuthApi {
    /// Build a client for the service at `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, me_url: config.endpoint(ME_PATH), login_url: config.endpoint(LOGIN_PATH) })
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn fetch_me(&self) -> Result<Identity, FetchError> {
        let response = self
            .http
            .get(&self.me_url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unauthenticated { status: status.as_u16() });
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        parse_identity(&text)
    }

    async fn login(&self, payload: &LoginPayload) -> Result<(), LoginError> {
        let response = self
            .http
            .post(&self.login_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| LoginError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response
            .text()
            .await
            .map_err(|e| LoginError::Transport(e.to_string()))?;
        Err(LoginError::rejected(status.as_u16(), &text))
    }
}

pub(crate) fn parse_identity(text: &str) -> Result<Identity, FetchError> {
    serde_json::from_str(text).map_err(|e| FetchError::Decode(e.to_string()))
}
