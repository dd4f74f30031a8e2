//! NGP VAN
//!
//! Basic auth with the application name and `"{api_key}|{mode}"`. Bodies
//! are snake_cased by default and errors come back in an `errors` array,
//! often with a 2xx status.

use crate::client::pagination::Pagination;
use crate::client::request::RequestOptions;
use crate::client::response::{self, RawResponse};
use crate::client::service::{Service, SessionConfig};
use crate::client::HttpClient;
use crate::config::settings::require;
use crate::config::{HttpSettings, NgpVanConfig};
use crate::error::{Result, StacError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;

pub const NGPVAN_BASE_URL: &str = "https://api.securevan.com/v4";

const LOCATION_ERROR_TEXT: &str = "'location' is required by the specified Event";

/// Database a key is used against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VanMode {
    VoterFile = 0,
    MyCampaign = 1,
}

impl TryFrom<u8> for VanMode {
    type Error = StacError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(VanMode::VoterFile),
            1 => Ok(VanMode::MyCampaign),
            other => Err(StacError::Config(format!(
                "NGP VAN mode must be 0 or 1, got {}",
                other
            ))),
        }
    }
}

pub struct NgpVanService {
    app_name: String,
    api_key: String,
    base_url: String,
}

impl NgpVanService {
    pub fn new(app_name: impl Into<String>, api_key: &str, mode: VanMode) -> Self {
        Self {
            app_name: app_name.into(),
            api_key: format!("{}|{}", api_key, mode as u8),
            base_url: NGPVAN_BASE_URL.to_string(),
        }
    }

    pub fn from_config(config: &NgpVanConfig, mode: VanMode) -> Result<Self> {
        let app_name = require(&config.app_name, "ngpvan", "app_name", "NGPVAN_APP_NAME")?;
        let api_key = require(&config.api_key, "ngpvan", "api_key", "NGPVAN_API_KEY")?;

        let mut service = Self::new(app_name, &api_key, mode);
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
impl Service for NgpVanService {
    fn name(&self) -> &str {
        "ngpvan"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_session(&self, _http: &reqwest::Client) -> Result<SessionConfig> {
        Ok(SessionConfig::new()
            .header("Content-Type", "application/json")
            .basic_auth(&self.app_name, &self.api_key))
    }

    fn check_response_for_rate_limit(&self, _response: &RawResponse) -> Option<Duration> {
        Some(Duration::from_secs(2))
    }

    fn snake_case_by_default(&self) -> bool {
        true
    }

    /// Undecodable bodies become `{}`; lists are keyed by the endpoint name
    fn transform_response(&self, response: &RawResponse, use_snake_case: bool) -> Result<Value> {
        let data = match response::decode_body(response) {
            Ok(Value::Null) | Err(_) => Value::Object(Map::new()),
            Ok(data) => data,
        };

        let data = match data {
            Value::Object(_) => data,
            other => {
                let mut wrapped = Map::new();
                wrapped.insert(response.last_path_segment(), other);
                Value::Object(wrapped)
            }
        };

        Ok(response::reshape(data, use_snake_case))
    }

    fn check_for_error(&self, response: &RawResponse, data: &Value, options: &RequestOptions) -> Result<()> {
        let errors = data
            .get("errors")
            .filter(|e| !e.is_null() && e.as_array().map_or(true, |a| !a.is_empty()));

        if let Some(errors) = errors {
            let location_only = errors.as_array().is_some_and(|list| {
                list.len() == 1 && list[0].get("text").and_then(Value::as_str) == Some(LOCATION_ERROR_TEXT)
            });

            if location_only && options.override_error_logging {
                return Err(StacError::EventLocationRequired(errors.clone()));
            }

            return Err(StacError::Api {
                service: self.name().to_string(),
                status: response.status.as_u16(),
                detail: errors.clone(),
            });
        }

        response::classify_status(self.name(), response.status.as_u16(), data)
    }
}

pub type NgpVanClient = HttpClient<NgpVanService>;

impl NgpVanClient {
    /// Client for `mode` using credentials from config
    pub fn from_config(config: &NgpVanConfig, mode: VanMode, settings: HttpSettings) -> Result<Self> {
        // VAN allows few concurrent connections per key
        let settings = HttpSettings {
            max_connections: settings.max_connections.min(5),
            ..settings
        };
        Ok(HttpClient::new(NgpVanService::from_config(config, mode)?, settings))
    }

    /// Follow `nextPageLink` until exhausted, collecting `items`
    pub async fn get_paginated_items(&self, endpoint: &str, options: RequestOptions) -> Result<Vec<Value>> {
        let pagination = if options.use_snake_case.unwrap_or(true) {
            Pagination::next_link("/items", "/next_page_link")
        } else {
            Pagination::next_link("/items", "/nextPageLink")
        };
        self.paginate(endpoint, options, &pagination).await
    }
}
