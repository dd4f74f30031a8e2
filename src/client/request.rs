//! Request Options
//!
//! Per-call inputs for the verb methods of `HttpClient`.

use serde::Serialize;

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Sent as `application/json`
    Json(serde_json::Value),

    /// Sent as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

/// Options for a single API call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Query string parameters
    pub params: Vec<(String, String)>,

    /// Optional request body
    pub body: Option<Body>,

    /// Attach response headers to the result
    pub return_headers: bool,

    /// Convert response keys to snake_case; `None` uses the service default
    pub use_snake_case: Option<bool>,

    /// Let the service raise quietly-handled errors without logging them
    pub override_error_logging: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Add several query parameters
    pub fn params<K, V, I>(mut self, params: I) -> Self
    where
        K: Into<String>,
        V: ToString,
        I: IntoIterator<Item = (K, V)>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    /// Replace a query parameter, adding it if missing
    pub fn set_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.retain(|(k, _)| k != key);
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Send a JSON body
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    /// Serialize any value as the JSON body
    pub fn json_from<T: Serialize>(self, body: &T) -> crate::error::Result<Self> {
        Ok(self.json(serde_json::to_value(body)?))
    }

    /// Send a form-encoded body
    pub fn form<K, V, I>(mut self, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.body = Some(Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ));
        self
    }

    pub fn with_headers(mut self) -> Self {
        self.return_headers = true;
        self
    }

    pub fn snake_case(mut self, enabled: bool) -> Self {
        self.use_snake_case = Some(enabled);
        self
    }

    pub fn override_error_logging(mut self) -> Self {
        self.override_error_logging = true;
        self
    }
}
