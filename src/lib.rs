//! stac-utils - Campaign tooling service clients
//!
//! Rate-limit aware HTTP clients for NGP VAN, Jira, Reach, the ticker,
//! Action Network, Mailchimp, Mailgun and Blue State Digital, built on one
//! generic [`HttpClient`], plus small helpers for cleaning campaign data.
//!
//! ```ignore
//! let clients = Clients::new()?;
//! let van = clients.ngpvan(VanMode::MyCampaign)?;
//! let events = van.get_paginated_items("events", RequestOptions::new()).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod secrets;
pub mod services;
pub mod util;

pub use client::{ApiResponse, BlockingClient, HttpClient, Pagination, RequestOptions, Service};
pub use config::{ConfigLoader, HttpSettings, LoggingSettings, RateLimitPolicy, StacConfig};
pub use error::{Result, StacError};
pub use logging::init_logging;
pub use secrets::{FileSecretStore, SecretStore, Secrets, SecretsLoader};
pub use services::{
    ActionNetworkClient, BsdClient, Email, Emailer, JiraClient, MailchimpClient, NewIssue,
    NgpVanClient, ReachClient, TickerClient, VanMode,
};

/// Builds service clients from one loaded configuration
pub struct Clients {
    config: StacConfig,
}

impl Clients {
    /// Load configuration from the default paths and the environment
    pub fn new() -> Result<Self> {
        let loader = ConfigLoader::new()?;
        Self::from_config(loader.into_config()?)
    }

    /// Load configuration from a specific file
    pub fn with_config_path(path: &str) -> Result<Self> {
        let loader = ConfigLoader::from_path(path)?;
        Self::from_config(loader.into_config()?)
    }

    /// Load configuration with loaded secrets layered over the environment
    pub fn with_secrets(secrets: &Secrets) -> Result<Self> {
        let mut loader = ConfigLoader::new()?;
        secrets.apply_to(&mut loader);
        Self::from_config(loader.into_config()?)
    }

    pub fn from_config(config: StacConfig) -> Result<Self> {
        config.tz()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StacConfig {
        &self.config
    }

    pub fn timezone(&self) -> chrono_tz::Tz {
        self.config.tz().unwrap_or(chrono_tz::America::New_York)
    }

    /// Install the configured log format on stderr, `info` unless
    /// `RUST_LOG` says otherwise
    pub fn init_logging(&self) -> Result<()> {
        logging::init_logging(&self.config.logging, "info")
    }

    /// Services with a config section
    pub fn configured_services(&self) -> Vec<&'static str> {
        self.config.configured_services()
    }

    fn settings(&self) -> HttpSettings {
        self.config.http.clone()
    }

    pub fn ngpvan(&self, mode: VanMode) -> Result<NgpVanClient> {
        let section = self.config.ngpvan.clone().unwrap_or_default();
        NgpVanClient::from_config(&section, mode, self.settings())
    }

    pub fn jira(&self) -> Result<JiraClient> {
        let section = self.config.jira.clone().unwrap_or_default();
        JiraClient::from_config(&section, self.settings())
    }

    pub fn reach(&self) -> Result<ReachClient> {
        let section = self.config.reach.clone().unwrap_or_default();
        ReachClient::from_config(&section, self.settings())
    }

    pub fn ticker(&self) -> Result<TickerClient> {
        let section = self.config.ticker.clone().unwrap_or_default();
        TickerClient::from_config(&section, self.settings())
    }

    pub fn action_network(&self) -> Result<ActionNetworkClient> {
        let section = self.config.action_network.clone().unwrap_or_default();
        ActionNetworkClient::from_config(&section, self.settings())
    }

    pub fn mailchimp(&self) -> Result<MailchimpClient> {
        let section = self.config.mailchimp.clone().unwrap_or_default();
        MailchimpClient::from_config(&section, self.settings())
    }

    pub fn mailgun(&self) -> Result<Emailer> {
        let section = self.config.mailgun.clone().unwrap_or_default();
        Emailer::from_config(&section, self.settings())
    }

    pub fn bsd(&self) -> Result<BsdClient> {
        let section = self.config.bsd.clone().unwrap_or_default();
        BsdClient::from_config(&section, self.settings())
    }
}
