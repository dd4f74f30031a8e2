//! Session Management
//!
//! One lazily created transport per client, shared by every call until it
//! is closed.

use crate::client::service::{Auth, Service};
use crate::config::HttpSettings;
use crate::error::{Result, StacError};
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, RequestBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// A transport plus the headers and credentials a service asked for
#[derive(Debug, Clone)]
pub struct Session {
    http: Client,
    headers: HeaderMap,
    auth: Option<Auth>,
}

impl Session {
    /// The underlying reqwest client
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Start a request with session headers and auth applied
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url).headers(self.headers.clone());

        match &self.auth {
            Some(Auth::Basic { username, password }) => builder.basic_auth(username, password.as_ref()),
            Some(Auth::Bearer(token)) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Owns the current session of one client
#[derive(Debug)]
pub struct SessionManager {
    settings: HttpSettings,
    current: Mutex<Option<Session>>,
    scopes: AtomicUsize,
}

impl SessionManager {
    pub fn new(settings: HttpSettings) -> Self {
        Self {
            settings,
            current: Mutex::new(None),
            scopes: AtomicUsize::new(0),
        }
    }

    /// Current session, creating it on first use
    pub async fn session<S: Service + ?Sized>(&self, service: &S) -> Result<Session> {
        if let Some(session) = self.current.lock().clone() {
            return Ok(session);
        }

        let http = self.build_transport()?;
        let config = service.create_session(&http).await?;
        debug!(service = service.name(), "Created session");

        let session = Session {
            http,
            headers: config.headers,
            auth: config.auth,
        };
        *self.current.lock() = Some(session.clone());

        Ok(session)
    }

    /// Whether a session is currently open
    pub fn is_open(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Drop the current session; the next call creates a new one
    pub fn close(&self) {
        if self.current.lock().take().is_some() {
            debug!("Closed session");
        }
    }

    /// Number of open scopes
    pub fn scope_depth(&self) -> usize {
        self.scopes.load(Ordering::SeqCst)
    }

    pub(crate) fn enter_scope(&self) {
        self.scopes.fetch_add(1, Ordering::SeqCst);
    }

    /// Leave a scope, closing the session when it was the outermost one
    pub(crate) fn exit_scope(&self) {
        let previous = self
            .scopes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        if previous <= 1 {
            self.close();
        }
    }

    fn build_transport(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .connect_timeout(Duration::from_secs(self.settings.connect_timeout_secs))
            .pool_max_idle_per_host(self.settings.max_connections)
            .build()
            .map_err(|e| StacError::Config(format!("Failed to create HTTP client: {}", e)))
    }
}
