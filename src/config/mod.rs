//! Configuration Module
//!
//! Handles configuration loading and the per-service settings schema.

pub mod loader;
pub mod settings;

pub use loader::{env_var_for, ConfigLoader};
pub use settings::{
    ActionNetworkConfig, BsdConfig, HttpSettings, JiraConfig, LoggingSettings, MailchimpConfig,
    MailgunConfig, NgpVanConfig, RateLimitPolicy, ReachConfig, SecretsConfig, StacConfig,
    TickerConfig,
};
