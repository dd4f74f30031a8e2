//! Action Network
//!
//! OSDI API authenticated with the `OSDI-API-Token` header. Collections are
//! paged with `page=N` and live under `_embedded`.

use crate::client::pagination::Pagination;
use crate::client::request::RequestOptions;
use crate::client::response::{self, RawResponse};
use crate::client::service::{Service, SessionConfig};
use crate::client::HttpClient;
use crate::config::settings::require;
use crate::config::{ActionNetworkConfig, HttpSettings};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

pub const ACTION_NETWORK_BASE_URL: &str = "https://actionnetwork.org/api/v2";

pub struct ActionNetworkService {
    api_token: String,
    base_url: String,
}

impl ActionNetworkService {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: ACTION_NETWORK_BASE_URL.to_string(),
        }
    }

    pub fn from_config(config: &ActionNetworkConfig) -> Result<Self> {
        let mut service = Self::new(require(
            &config.api_token,
            "action_network",
            "api_token",
            "ACTIONNETWORK_API_TOKEN",
        )?);
        if let Some(base_url) = &config.base_url {
            service.base_url = base_url.clone();
        }
        Ok(service)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Service for ActionNetworkService {
    fn name(&self) -> &str {
        "action_network"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_session(&self, _http: &reqwest::Client) -> Result<SessionConfig> {
        Ok(SessionConfig::new()
            .header("OSDI-API-Token", &self.api_token)
            .header("Content-Type", "application/json"))
    }

    fn check_response_for_rate_limit(&self, _response: &RawResponse) -> Option<Duration> {
        Some(Duration::from_secs(1))
    }

    fn transform_response(&self, response: &RawResponse, use_snake_case: bool) -> Result<Value> {
        let data = match response::decode_body(response) {
            Ok(Value::Null) | Err(_) => Value::Object(Map::new()),
            Ok(data) => data,
        };
        Ok(response::reshape(data, use_snake_case))
    }
}

pub type ActionNetworkClient = HttpClient<ActionNetworkService>;

impl ActionNetworkClient {
    pub fn from_config(config: &ActionNetworkConfig, settings: HttpSettings) -> Result<Self> {
        Ok(HttpClient::new(ActionNetworkService::from_config(config)?, settings))
    }

    /// Every item of an OSDI collection, e.g. `get_all("people", "osdi:people", ..)`
    pub async fn get_all(
        &self,
        endpoint: &str,
        collection: &str,
        options: RequestOptions,
    ) -> Result<Vec<Value>> {
        let pagination = Pagination::page_number(&format!("/_embedded/{}", collection));
        self.paginate(endpoint, options, &pagination).await
    }
}
