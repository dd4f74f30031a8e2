//! Service Abstraction
//!
//! The per-vendor half of a client: where to send requests, how to
//! authenticate, and how to read what comes back. `HttpClient` supplies the
//! other half (sessions, rate limits, the request loop).

use crate::client::rate_limiter::RateLimitHeaders;
use crate::client::request::RequestOptions;
use crate::client::response::{self, RawResponse};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::time::Duration;

/// Credentials attached to every request of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP basic auth
    Basic {
        username: String,
        password: Option<String>,
    },

    /// `Authorization: Bearer <token>`
    Bearer(String),
}

/// What a service contributes to a freshly created session
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Headers sent with every request
    pub headers: HeaderMap,

    /// Optional credentials
    pub auth: Option<Auth>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header, skipping names or values that are not valid HTTP
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::try_from(name),
            reqwest::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(Auth::Basic {
            username: username.into(),
            password: Some(password.into()),
        });
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::Bearer(token.into()));
        self
    }
}

/// Static limit for one endpoint: `requests` allowed per `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointLimit {
    pub requests: u32,
    pub window: Duration,
}

impl EndpointLimit {
    /// Even spacing between calls that keeps within the limit
    pub fn spacing(&self) -> Duration {
        if self.requests == 0 {
            return self.window;
        }
        self.window / self.requests
    }
}

/// A remote API that `HttpClient` can talk to
#[async_trait]
pub trait Service: Send + Sync {
    /// Short name used in errors, logs and as the default rate limit category
    fn name(&self) -> &str;

    /// Base URL every relative endpoint is joined to
    fn base_url(&self) -> &str;

    /// Headers and auth for a new session
    ///
    /// `http` is the transport the session will use, for services that must
    /// fetch a token before they can authenticate.
    async fn create_session(&self, _http: &reqwest::Client) -> Result<SessionConfig> {
        Ok(SessionConfig::default())
    }

    /// Refresh credentials after a 401. Returns `false` when the service has
    /// nothing to refresh, in which case the 401 is final.
    async fn refresh_auth(&self, _http: &reqwest::Client) -> Result<bool> {
        Ok(false)
    }

    /// Query string for one attempt at `endpoint`, built fresh for every retry
    fn query_params(&self, _endpoint: &str, params: &[(String, String)]) -> Vec<(String, String)> {
        params.to_vec()
    }

    /// Known per-endpoint limits, used to space retries after a 429
    fn rate_limits(&self) -> HashMap<String, EndpointLimit> {
        HashMap::new()
    }

    /// Category the tracker files an endpoint's limits under
    fn rate_limit_category(&self, _endpoint: &str) -> String {
        self.name().to_string()
    }

    /// Header names carrying rate limit info
    fn rate_limit_headers(&self) -> RateLimitHeaders {
        RateLimitHeaders::default()
    }

    /// Fixed wait a service prescribes after being rate limited
    fn check_response_for_rate_limit(&self, _response: &RawResponse) -> Option<Duration> {
        None
    }

    /// Whether response keys are converted to snake_case unless the caller says otherwise
    fn snake_case_by_default(&self) -> bool {
        false
    }

    /// Decode and reshape a response body
    fn transform_response(&self, response: &RawResponse, use_snake_case: bool) -> Result<serde_json::Value> {
        let data = response::decode_body(response)?;
        Ok(response::reshape(data, use_snake_case))
    }

    /// Turn an unsuccessful response into a typed failure
    fn check_for_error(
        &self,
        response: &RawResponse,
        data: &serde_json::Value,
        _options: &RequestOptions,
    ) -> Result<()> {
        response::classify_status(self.name(), response.status.as_u16(), data)
    }
}
