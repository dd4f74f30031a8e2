//! Configuration Schema
//!
//! Settings for the HTTP layer and credentials for each service.

use crate::error::{Result, StacError};
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StacConfig {
    /// Transport, retry and rate limit behaviour shared by every client
    #[serde(default)]
    pub http: HttpSettings,

    /// IANA timezone for date helpers
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<SecretsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ngpvan: Option<NgpVanConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira: Option<JiraConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reach: Option<ReachConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<TickerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_network: Option<ActionNetworkConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailchimp: Option<MailchimpConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailgun: Option<MailgunConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bsd: Option<BsdConfig>,
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

impl Default for StacConfig {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            timezone: default_timezone(),
            logging: LoggingSettings::default(),
            secrets: None,
            ngpvan: None,
            jira: None,
            reach: None,
            ticker: None,
            action_network: None,
            mailchimp: None,
            mailgun: None,
            bsd: None,
        }
    }
}

impl StacConfig {
    /// Parsed timezone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| StacError::Config(format!("Unknown timezone '{}'", self.timezone)))
    }

    /// Names of the services that have a config section
    pub fn configured_services(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.ngpvan.is_some() {
            names.push("ngpvan");
        }
        if self.jira.is_some() {
            names.push("jira");
        }
        if self.reach.is_some() {
            names.push("reach");
        }
        if self.ticker.is_some() {
            names.push("ticker");
        }
        if self.action_network.is_some() {
            names.push("action_network");
        }
        if self.mailchimp.is_some() {
            names.push("mailchimp");
        }
        if self.mailgun.is_some() {
            names.push("mailgun");
        }
        if self.bsd.is_some() {
            names.push("bsd");
        }
        names
    }
}

/// What the client does when a rate limit is hit
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitPolicy {
    /// Wait for the window to reset, then retry the call once
    #[default]
    Wait,

    /// Fail immediately with `StacError::RateLimited`
    Fail,
}

/// HTTP layer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpSettings {
    /// Whole-request timeout
    pub timeout_secs: u64,

    pub connect_timeout_secs: u64,

    /// Idle pooled connections kept per host
    pub max_connections: usize,

    /// Retries for connection failures and timeouts (0 disables)
    pub retry_limit: u32,

    /// Base wait for transport retries and fallback rate limit wait
    pub retry_wait_secs: u64,

    pub rate_limit_policy: RateLimitPolicy,

    /// Longest rate limit wait before failing instead
    pub max_rate_limit_wait_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            connect_timeout_secs: 10,
            max_connections: 25,
            retry_limit: 0,
            retry_wait_secs: 7,
            rate_limit_policy: RateLimitPolicy::Wait,
            max_rate_limit_wait_secs: 300,
        }
    }
}

/// Deployment stage and state label for log output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `production` switches to JSON lines
    pub stage: String,

    /// State code attached to every log line
    pub state: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            stage: "dev".to_string(),
            state: None,
        }
    }
}

impl LoggingSettings {
    pub fn is_production(&self) -> bool {
        self.stage.eq_ignore_ascii_case("production")
    }

    /// Uppercased state, `XX` when unset or blank
    pub fn state_label(&self) -> String {
        match self.state.as_deref().map(str::trim) {
            Some(state) if !state.is_empty() => state.to_uppercase(),
            _ => "XX".to_string(),
        }
    }
}

/// Where the secrets loader looks by default
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Root directory of the file-backed secret store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<String>,
}

/// NGP VAN credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NgpVanConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Jira credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JiraConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Organization's Jira URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Reach credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReachConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_password: Option<String>,

    /// Host root; the API lives under `/api/v1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Ticker endpoint and credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_pass: Option<String>,

    /// Sent with every metric so test runs can be filtered out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_testing: Option<String>,
}

/// Action Network credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionNetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Mailchimp credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailchimpConfig {
    /// Key with the data center suffix, e.g. `abc123-us9`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Mailgun credentials and sender defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailgunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_addr: Option<String>,

    /// Comma separated reply-to addresses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Fetch a required field or report which setting is missing
/// Blue State Digital API credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BsdConfig {
    /// Instance root, e.g. `https://client.cp.bsd.net/page/api`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
}

pub(crate) fn require(
    value: &Option<String>,
    service: &str,
    field: &str,
    env: &str,
) -> Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StacError::MissingCredential {
            service: service.to_string(),
            field: field.to_string(),
            env_hint: env.to_string(),
        })
}
