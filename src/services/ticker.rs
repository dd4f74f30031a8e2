//! Ticker
//!
//! Buffers metrics and posts them in one batch to the `/ticker` endpoint.
//!
//! ```ignore
//! let mut ticker = TickerClient::from_config(&ticker_config, settings)?;
//! ticker.add_data("FL", "AWS Lambda", "event-sync", "events created", 155.0);
//! ticker.add_data("FL", "AWS Lambda", "event-sync", "signups created", 1342.0);
//! ticker.send_to_ticker().await?;
//! ```

use crate::client::request::RequestOptions;
use crate::client::response::{self, ApiResponse, RawResponse};
use crate::client::service::{Service, SessionConfig};
use crate::client::HttpClient;
use crate::config::settings::require;
use crate::config::{HttpSettings, TickerConfig};
use crate::error::{Result, StacError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

pub struct TickerService {
    url: String,
    auth_user: String,
    auth_pass: String,
}

impl TickerService {
    pub fn new(url: impl Into<String>, auth_user: impl Into<String>, auth_pass: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_user: auth_user.into(),
            auth_pass: auth_pass.into(),
        }
    }

    pub fn from_config(config: &TickerConfig) -> Result<Self> {
        Ok(Self::new(
            require(&config.url, "ticker", "url", "TICKER_URL")?,
            require(&config.auth_user, "ticker", "auth_user", "AUTH_USER")?,
            require(&config.auth_pass, "ticker", "auth_pass", "AUTH_PASS")?,
        ))
    }
}

#[async_trait]
impl Service for TickerService {
    fn name(&self) -> &str {
        "ticker"
    }

    fn base_url(&self) -> &str {
        &self.url
    }

    async fn create_session(&self, _http: &reqwest::Client) -> Result<SessionConfig> {
        Ok(SessionConfig::new().basic_auth(&self.auth_user, &self.auth_pass))
    }

    /// Anything that is not JSON is kept as text
    fn transform_response(&self, response: &RawResponse, _use_snake_case: bool) -> Result<Value> {
        Ok(response::decode_body(response).unwrap_or_else(|_| Value::String(response.text())))
    }

    fn check_for_error(&self, response: &RawResponse, data: &Value, _options: &RequestOptions) -> Result<()> {
        if response.status.as_u16() != 200 {
            return Err(StacError::Api {
                service: self.name().to_string(),
                status: response.status.as_u16(),
                detail: data.clone(),
            });
        }
        Ok(())
    }
}

/// One metric reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerMetric {
    pub state: String,
    pub source: String,
    pub task: String,
    pub metric: String,
    pub amount: f64,
    pub is_testing: String,
}

/// Batches metrics for the ticker
pub struct TickerClient {
    client: HttpClient<TickerService>,
    data: Vec<TickerMetric>,
    is_testing: String,
}

impl TickerClient {
    pub fn new(client: HttpClient<TickerService>) -> Self {
        Self {
            client,
            data: Vec::new(),
            is_testing: String::new(),
        }
    }

    pub fn from_config(config: &TickerConfig, settings: HttpSettings) -> Result<Self> {
        let mut ticker = Self::new(HttpClient::new(TickerService::from_config(config)?, settings));
        ticker.is_testing = config.is_testing.clone().unwrap_or_default();
        Ok(ticker)
    }

    /// Value sent as `is_testing` with every metric
    pub fn is_testing(mut self, is_testing: impl Into<String>) -> Self {
        self.is_testing = is_testing.into();
        self
    }

    pub fn client(&self) -> &HttpClient<TickerService> {
        &self.client
    }

    /// Metrics waiting to be sent
    pub fn data(&self) -> &[TickerMetric] {
        &self.data
    }

    pub fn add_data(&mut self, state: &str, source: &str, task: &str, metric: &str, amount: f64) {
        self.data.push(TickerMetric {
            state: state.to_string(),
            source: source.to_string(),
            task: task.to_string(),
            metric: metric.to_string(),
            amount,
            is_testing: self.is_testing.clone(),
        });
    }

    /// Send buffered metrics
    ///
    /// The buffer is cleared only after the ticker accepts the batch.
    /// Returns `None` when there was nothing to send.
    pub async fn send_to_ticker(&mut self) -> Result<Option<ApiResponse>> {
        if self.data.is_empty() {
            info!("No data to send to ticker");
            return Ok(None);
        }

        let options = RequestOptions::new().json_from(&self.data)?;
        let response = self.client.post("ticker", options).await?;
        self.data.clear();
        Ok(Some(response))
    }
}
