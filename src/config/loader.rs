//! Configuration Loader
//!
//! Loads and merges configuration from built-in defaults, config files and
//! the environment. This is the only place environment variables are read.

use crate::config::settings::StacConfig;
use crate::error::{Result, StacError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables and the config field each one sets
const ENV_VARS: &[(&str, &str, &str)] = &[
    ("", "timezone", "TIMEZONE"),
    ("logging", "stage", "STAGE"),
    ("logging", "state", "STATE"),
    ("secrets", "secret_name", "SECRET_NAME"),
    ("secrets", "region", "AWS_REGION"),
    ("ngpvan", "app_name", "NGPVAN_APP_NAME"),
    ("ngpvan", "api_key", "NGPVAN_API_KEY"),
    ("jira", "api_user", "JIRA_API_USER"),
    ("jira", "api_key", "JIRA_API_KEY"),
    ("jira", "base_url", "JIRA_BASE_URL"),
    ("reach", "api_user", "REACH_API_USER"),
    ("reach", "api_password", "REACH_API_PASSWORD"),
    ("ticker", "url", "TICKER_URL"),
    ("ticker", "auth_user", "AUTH_USER"),
    ("ticker", "auth_pass", "AUTH_PASS"),
    ("ticker", "is_testing", "IS_TESTING"),
    ("action_network", "api_token", "ACTIONNETWORK_API_TOKEN"),
    ("mailchimp", "api_key", "MAILCHIMP_API_KEY"),
    ("mailgun", "api_key", "MAILGUN_API_KEY"),
    ("mailgun", "domain", "MAILGUN_DOMAIN"),
    ("bsd", "url", "BSD_URL"),
    ("bsd", "api_id", "BSD_API_ID"),
    ("bsd", "api_secret", "BSD_API_SECRET"),
];

/// Environment variable name for a config field, used in error hints
pub fn env_var_for(section: &str, field: &str) -> Option<&'static str> {
    ENV_VARS
        .iter()
        .find(|(s, f, _)| *s == section && *f == field)
        .map(|(_, _, env)| *env)
}

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    merged: Value,
}

impl ConfigLoader {
    /// Load defaults, config files from the default paths, then `.env` and
    /// the process environment
    pub fn new() -> Result<Self> {
        let mut loader = Self::empty();

        loader.load_builtin_defaults()?;
        loader.load_from_default_paths()?;
        loader.apply_environment(read_dotenv(None));

        Ok(loader)
    }

    /// Load defaults, a specific config file, then `.env` and the process
    /// environment
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self::empty();

        loader.load_builtin_defaults()?;
        loader.load_from_file(path)?;
        loader.apply_environment(read_dotenv(None));

        Ok(loader)
    }

    /// Built-in defaults only; nothing is read from disk or the environment
    pub fn defaults() -> Result<Self> {
        let mut loader = Self::empty();
        loader.load_builtin_defaults()?;
        Ok(loader)
    }

    fn empty() -> Self {
        Self {
            merged: Value::Object(Map::new()),
        }
    }

    /// Load built-in defaults
    fn load_builtin_defaults(&mut self) -> Result<()> {
        let defaults = include_str!("../../defaults.json");
        let value: Value = serde_json::from_str(defaults).map_err(|e| {
            StacError::Config(format!("Failed to parse built-in defaults.json: {}", e))
        })?;

        self.merge_value(value);
        Ok(())
    }

    /// Load configuration from default paths
    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_config_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }

        Ok(())
    }

    /// Config paths, least specific first so later files win
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".stac_utils").join("config.json"));
        }

        // 2. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("stac_utils").join("config.json"));
        }

        // 3. Current directory
        paths.push(PathBuf::from("stac_utils.json"));

        // 4. Environment variable
        if let Ok(custom_path) = std::env::var("STAC_UTILS_CONFIG") {
            paths.push(PathBuf::from(custom_path));
        }

        paths
    }

    /// Load configuration from a specific file
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StacError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            StacError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        debug!("Loaded config from {}", path.display());
        self.merge_value(value);
        Ok(())
    }

    /// Overlay values from environment variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overlay = Map::new();

        for (section, field, env) in ENV_VARS {
            let Some(value) = lookup(env).filter(|v| !v.is_empty()) else {
                continue;
            };

            if section.is_empty() {
                overlay.insert(field.to_string(), Value::String(value));
            } else if let Value::Object(fields) = overlay
                .entry(section.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
            {
                fields.insert(field.to_string(), Value::String(value));
            }
        }

        self.merge_value(Value::Object(overlay));
    }

    /// Overlay the process environment, falling back to `dotenv` values for
    /// variables the process does not set
    fn apply_environment(&mut self, dotenv: HashMap<String, String>) {
        self.apply_env_overrides(|name| {
            std::env::var(name)
                .ok()
                .or_else(|| dotenv.get(name).cloned())
        });
    }

    /// Merge another config into this one; objects merge key by key and
    /// anything else is replaced
    pub fn merge_value(&mut self, other: Value) {
        merge(&mut self.merged, other);
    }

    /// The merged configuration
    pub fn config(&self) -> Result<StacConfig> {
        serde_json::from_value(self.merged.clone())
            .map_err(|e| StacError::Config(format!("Invalid configuration: {}", e)))
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> Result<StacConfig> {
        serde_json::from_value(self.merged)
            .map_err(|e| StacError::Config(format!("Invalid configuration: {}", e)))
    }
}

/// Variables from a `.env` file, found the usual way when `path` is `None`
fn read_dotenv(path: Option<&Path>) -> HashMap<String, String> {
    let iter = match path {
        Some(path) => dotenvy::from_path_iter(path),
        None => dotenvy::dotenv_iter(),
    };
    match iter {
        Ok(iter) => iter.filter_map(|pair| pair.ok()).collect(),
        Err(_) => HashMap::new(),
    }
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
