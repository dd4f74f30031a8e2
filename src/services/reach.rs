//! Reach
//!
//! OAuth password grant against the host root; the token is attached as a
//! bearer header and fetched again whenever the API answers 401.

use crate::client::response::RawResponse;
use crate::client::service::{Service, SessionConfig};
use crate::client::HttpClient;
use crate::config::settings::require;
use crate::config::{HttpSettings, ReachConfig};
use crate::error::{Result, StacError};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

pub const REACH_ROOT_URL: &str = "https://api.reach.vote";

pub struct ReachService {
    api_user: String,
    api_password: String,
    root_url: String,
    base_url: String,
    access_token: RwLock<Option<String>>,
}

impl ReachService {
    pub fn new(api_user: impl Into<String>, api_password: impl Into<String>) -> Self {
        Self::with_root_url(api_user, api_password, REACH_ROOT_URL)
    }

    /// Point at another host; the API is served under `/api/v1`
    pub fn with_root_url(
        api_user: impl Into<String>,
        api_password: impl Into<String>,
        root_url: &str,
    ) -> Self {
        let root_url = root_url.trim_end_matches('/').to_string();
        Self {
            api_user: api_user.into(),
            api_password: api_password.into(),
            base_url: format!("{}/api/v1", root_url),
            root_url,
            access_token: RwLock::new(None),
        }
    }

    pub fn from_config(config: &ReachConfig) -> Result<Self> {
        let api_user = require(&config.api_user, "reach", "api_user", "REACH_API_USER")?;
        let api_password = require(&config.api_password, "reach", "api_password", "REACH_API_PASSWORD")?;

        Ok(Self::with_root_url(
            api_user,
            api_password,
            config.base_url.as_deref().unwrap_or(REACH_ROOT_URL),
        ))
    }

    /// Token currently in use, if one has been fetched
    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().clone()
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write() = Some(token.into());
    }

    async fn fetch_token(&self, http: &reqwest::Client) -> Result<String> {
        let url = format!("{}/oauth/token", self.root_url);
        debug!("Requesting Reach token from {}", url);

        let response = http
            .post(&url)
            .form(&[
                ("username", self.api_user.as_str()),
                ("password", self.api_password.as_str()),
            ])
            .send()
            .await?;
        let raw = RawResponse::read(response).await?;

        if !raw.status.is_success() {
            return Err(StacError::Auth {
                service: self.name().to_string(),
                message: format!("token request returned {}: {}", raw.status, raw.text()),
            });
        }

        let body: Value = serde_json::from_slice(&raw.body)?;
        body.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StacError::Auth {
                service: self.name().to_string(),
                message: "token response has no access_token".to_string(),
            })
    }
}

#[async_trait]
impl Service for ReachService {
    fn name(&self) -> &str {
        "reach"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_session(&self, http: &reqwest::Client) -> Result<SessionConfig> {
        let token = match self.access_token() {
            Some(token) => token,
            None => {
                let token = self.fetch_token(http).await?;
                self.set_access_token(token.clone());
                token
            }
        };
        Ok(SessionConfig::new().bearer(token))
    }

    async fn refresh_auth(&self, http: &reqwest::Client) -> Result<bool> {
        let token = self.fetch_token(http).await?;
        self.set_access_token(token);
        Ok(true)
    }
}

pub type ReachClient = HttpClient<ReachService>;

impl ReachClient {
    pub fn from_config(config: &ReachConfig, settings: HttpSettings) -> Result<Self> {
        Ok(HttpClient::new(ReachService::from_config(config)?, settings))
    }
}
