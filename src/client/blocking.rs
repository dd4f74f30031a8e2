//! Blocking Client
//!
//! Synchronous facade over `HttpClient` for callers without an async
//! runtime. Each call blocks the current thread, including rate limit waits.
//! Must not be used from inside a tokio runtime.

use crate::client::http::HttpClient;
use crate::client::pagination::Pagination;
use crate::client::request::RequestOptions;
use crate::client::response::ApiResponse;
use crate::client::service::Service;
use crate::error::{Result, StacError};
use reqwest::Method;
use serde_json::Value;
use std::future::Future;

/// Blocking wrapper owning its own runtime
pub struct BlockingClient<S: Service> {
    inner: HttpClient<S>,
    runtime: tokio::runtime::Runtime,
}

impl<S: Service> BlockingClient<S> {
    pub fn new(inner: HttpClient<S>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StacError::Config(format!("Failed to create runtime: {}", e)))?;

        Ok(Self { inner, runtime })
    }

    /// The wrapped async client
    pub fn inner(&self) -> &HttpClient<S> {
        &self.inner
    }

    /// Run any future against the wrapped client
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn get(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::GET, endpoint, options)
    }

    pub fn post(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::POST, endpoint, options)
    }

    pub fn put(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::PUT, endpoint, options)
    }

    pub fn patch(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::PATCH, endpoint, options)
    }

    pub fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::DELETE, endpoint, options)
    }

    pub fn call_api(&self, method: Method, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.runtime
            .block_on(self.inner.call_api(method, endpoint, options))
    }

    pub fn paginate(
        &self,
        endpoint: &str,
        options: RequestOptions,
        pagination: &Pagination,
    ) -> Result<Vec<Value>> {
        self.runtime
            .block_on(self.inner.paginate(endpoint, options, pagination))
    }

    /// Close the wrapped client's session
    pub fn close_session(&self) {
        self.inner.close_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpSettings;
    use async_trait::async_trait;

    struct Plain(String);

    #[async_trait]
    impl Service for Plain {
        fn name(&self) -> &str {
            "plain"
        }

        fn base_url(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn test_blocking_get() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/status")
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create();

        let client =
            BlockingClient::new(HttpClient::new(Plain(server.url()), HttpSettings::default())).unwrap();
        let response = client.get("status", RequestOptions::new()).unwrap();

        mock.assert();
        assert_eq!(response.data["ok"], true);
        assert!(client.inner().has_session());

        client.close_session();
        assert!(!client.inner().has_session());
    }

    #[test]
    fn test_blocking_error() {
        let mut server = mockito::Server::new();
        server.mock("DELETE", "/status").with_status(500).create();

        let client =
            BlockingClient::new(HttpClient::new(Plain(server.url()), HttpSettings::default())).unwrap();

        assert!(matches!(
            client.delete("status", RequestOptions::new()),
            Err(StacError::Api { status: 500, .. })
        ));
    }
}
