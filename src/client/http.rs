//! HTTP Client
//!
//! Generic verb client with lazily created sessions, rate limit waits and
//! typed error classification. One instance talks to one `Service`.

use crate::client::rate_limiter::RateLimitTracker;
use crate::client::request::{Body, RequestOptions};
use crate::client::response::{header_map, ApiResponse, RawResponse};
use crate::client::service::Service;
use crate::client::session::{Session, SessionManager};
use crate::config::{HttpSettings, RateLimitPolicy};
use crate::error::{Result, StacError};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::{Method, StatusCode};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// HTTP client for a single service
pub struct HttpClient<S: Service> {
    service: S,
    settings: HttpSettings,
    sessions: SessionManager,
    rate_limiter: Arc<RateLimitTracker>,
}

impl<S: Service> HttpClient<S> {
    /// Create a new client for `service`
    pub fn new(service: S, settings: HttpSettings) -> Self {
        Self {
            sessions: SessionManager::new(settings.clone()),
            service,
            settings,
            rate_limiter: Arc::new(RateLimitTracker::new()),
        }
    }

    /// Share a rate limit tracker with other clients of the same service
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimitTracker>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    /// Get the rate limiter
    pub fn rate_limiter(&self) -> &Arc<RateLimitTracker> {
        &self.rate_limiter
    }

    /// Current session, created on first use
    pub async fn session(&self) -> Result<Session> {
        self.sessions.session(&self.service).await
    }

    /// Whether a session is currently open
    pub fn has_session(&self) -> bool {
        self.sessions.is_open()
    }

    /// Close the current session
    pub fn close_session(&self) {
        self.sessions.close();
    }

    /// Open a scope that closes the session when the outermost scope drops
    pub fn session_scope(&self) -> SessionScope<'_, S> {
        self.sessions.enter_scope();
        SessionScope { client: self }
    }

    /// Join the base URL and an endpoint; absolute URLs pass through
    pub fn format_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.service.base_url().trim_matches('/'),
            endpoint.trim_matches('/')
        )
    }

    pub async fn get(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::GET, endpoint, options).await
    }

    pub async fn post(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::POST, endpoint, options).await
    }

    pub async fn put(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::PUT, endpoint, options).await
    }

    pub async fn patch(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::PATCH, endpoint, options).await
    }

    pub async fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse> {
        self.call_api(Method::DELETE, endpoint, options).await
    }

    /// Make a request, waiting out rate limits and refreshing auth once
    #[tracing::instrument(skip(self, options), fields(service = self.service.name()))]
    pub async fn call_api(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse> {
        let url = self.format_url(endpoint);
        let category = self.service.rate_limit_category(endpoint);
        let header_names = self.service.rate_limit_headers();
        let use_snake_case = options
            .use_snake_case
            .unwrap_or_else(|| self.service.snake_case_by_default());

        let mut backoff = self.transport_backoff();
        let mut transport_failures = 0;
        let mut rate_limit_retried = false;
        let mut auth_refreshed = false;

        loop {
            self.wait_for_capacity(&category).await?;

            let session = self.session().await?;
            let params = self.service.query_params(endpoint, &options.params);
            debug!("{} {} params={:?}", method, url, params);

            let mut request = session.request(method.clone(), &url).query(&params);
            request = match &options.body {
                Some(Body::Json(body)) => request.json(body),
                Some(Body::Form(fields)) => request.form(fields),
                None => request,
            };

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    if (e.is_connect() || e.is_timeout()) && transport_failures < self.settings.retry_limit {
                        transport_failures += 1;
                        let wait = backoff.next_backoff().unwrap_or(self.retry_wait());
                        warn!(
                            "{} {} failed ({}), retry {}/{} in {:?}",
                            method, url, e, transport_failures, self.settings.retry_limit, wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                    return Err(e.into());
                }
            };

            let raw = RawResponse::read(response).await?;
            self.rate_limiter
                .update_from_response(&category, &raw.headers, &header_names);

            if RateLimitTracker::is_rate_limit_error(raw.status.as_u16(), &raw.text()) {
                let wait = self.rate_limit_wait(endpoint, &raw);
                self.rate_limiter.mark_exhausted(&category, wait);

                if !rate_limit_retried && self.settings.rate_limit_policy == RateLimitPolicy::Wait {
                    warn!("{}: rate limit hit on {}, waiting {:?}", self.service.name(), endpoint, wait);
                    rate_limit_retried = true;
                    continue;
                }

                return Err(StacError::RateLimited {
                    service: self.service.name().to_string(),
                    retry_after: Some(ceil_secs(wait)),
                });
            }

            if raw.status == StatusCode::UNAUTHORIZED && !auth_refreshed {
                let refreshed = self.service.refresh_auth(session.http()).await?;
                if refreshed {
                    warn!("{}: 401 on {}, refreshed auth", self.service.name(), endpoint);
                    auth_refreshed = true;
                    self.sessions.close();
                    continue;
                }
            }

            let data = self.service.transform_response(&raw, use_snake_case)?;

            if let Err(e) = self.service.check_for_error(&raw, &data, &options) {
                if !options.override_error_logging {
                    error!("{} {} failed: {}", method, url, e);
                }
                return Err(e);
            }

            return Ok(ApiResponse {
                status: raw.status.as_u16(),
                data,
                headers: options.return_headers.then(|| header_map(&raw.headers)),
            });
        }
    }

    /// Block until the category has capacity, or fail under `RateLimitPolicy::Fail`
    async fn wait_for_capacity(&self, category: &str) -> Result<()> {
        let Some(wait) = self.rate_limiter.should_wait(category) else {
            return Ok(());
        };

        let max_wait = Duration::from_secs(self.settings.max_rate_limit_wait_secs);
        if self.settings.rate_limit_policy == RateLimitPolicy::Fail || wait > max_wait {
            return Err(StacError::RateLimited {
                service: self.service.name().to_string(),
                retry_after: Some(ceil_secs(wait)),
            });
        }

        info!("{}: '{}' exhausted, waiting {:?}", self.service.name(), category, wait);
        tokio::time::sleep(wait).await;
        Ok(())
    }

    /// How long to back off after a rate limit response
    fn rate_limit_wait(&self, endpoint: &str, raw: &RawResponse) -> Duration {
        if let Some(wait) = self.service.check_response_for_rate_limit(raw) {
            return wait;
        }

        let names = self.service.rate_limit_headers();
        if let Some(wait) = RateLimitTracker::retry_after_from_headers(&raw.headers, &names) {
            return wait;
        }

        self.service
            .rate_limits()
            .get(endpoint.trim_matches('/'))
            .map(|limit| limit.spacing())
            .unwrap_or_else(|| self.retry_wait())
    }

    fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.settings.retry_wait_secs)
    }

    fn transport_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.retry_wait(),
            initial_interval: self.retry_wait(),
            max_interval: self.retry_wait() * 8,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs().saturating_add(u64::from(d.subsec_nanos() > 0))
}

/// Scoped use of a client's session
///
/// Scopes nest; the session closes when the outermost one is dropped.
pub struct SessionScope<'a, S: Service> {
    client: &'a HttpClient<S>,
}

impl<S: Service> Deref for SessionScope<'_, S> {
    type Target = HttpClient<S>;

    fn deref(&self) -> &Self::Target {
        self.client
    }
}

impl<S: Service> Drop for SessionScope<'_, S> {
    fn drop(&mut self) {
        self.client.sessions.exit_scope();
    }
}
