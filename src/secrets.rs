//! Secrets Loading
//!
//! Collects credentials from a secret store, a JSON file and an explicit
//! dictionary into one flat string map. Later sources win: the store is
//! overridden by the file, which is overridden by the dictionary.
//!
//! The result is applied to a [`ConfigLoader`] through the same variable
//! names the environment uses, so nothing here touches the process
//! environment.
//!
//! ```ignore
//! let secrets = SecretsLoader::new()
//!     .secret_name("spam-credentials")
//!     .store(FileSecretStore::new("/var/lib/stac/secrets"))
//!     .file("local-overrides.json")
//!     .load()
//!     .await?;
//! let mut loader = ConfigLoader::new()?;
//! secrets.apply_to(&mut loader);
//! ```

use crate::config::{ConfigLoader, SecretsConfig};
use crate::error::{Result, StacError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Storage for named JSON secret blobs, partitioned by region
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, name: &str, region: &str) -> Result<Map<String, Value>>;

    async fn put(&self, name: &str, region: &str, values: &Map<String, Value>) -> Result<()>;
}

/// Secret store on the local filesystem, one file per secret at
/// `<root>/<region>/<name>.json`
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, name: &str, region: &str) -> PathBuf {
        self.root.join(region).join(format!("{}.json", name))
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, name: &str, region: &str) -> Result<Map<String, Value>> {
        let path = self.path_for(name, region);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            StacError::Secrets(format!("Failed to read secret '{}' in {}: {}", name, region, e))
        })?;
        read_object(&content, &path)
    }

    async fn put(&self, name: &str, region: &str, values: &Map<String, Value>) -> Result<()> {
        let path = self.path_for(name, region);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_vec(values)?).await?;
        debug!("Stored secret '{}' in {}", name, region);
        Ok(())
    }
}

fn read_object(content: &str, path: &Path) -> Result<Map<String, Value>> {
    match serde_json::from_str(content) {
        Ok(Value::Object(values)) => Ok(values),
        Ok(_) => Err(StacError::Secrets(format!(
            "{} does not hold a JSON object",
            path.display()
        ))),
        Err(e) => Err(StacError::Secrets(format!(
            "Failed to parse {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Flat name to value map of loaded secrets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    values: BTreeMap<String, String>,
}

impl Secrets {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value that must be present and non-empty
    pub fn require(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(StacError::Secrets(format!("Missing secret '{}'", name))),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `values`, replacing existing names
    pub fn extend(&mut self, values: Map<String, Value>) {
        for (name, value) in values {
            self.values.insert(name, stringify(value));
        }
    }

    /// Layer these secrets over a config, as if they were environment
    /// variables
    pub fn apply_to(&self, loader: &mut ConfigLoader) {
        loader.apply_env_overrides(|name| self.get(name).map(str::to_string));
    }

    /// Write the secrets as a JSON object, e.g. to seed a store
    pub async fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let values: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        tokio::fs::write(path, serde_json::to_vec_pretty(&values)?).await?;
        Ok(())
    }
}

fn stringify(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Builder that gathers secrets from every configured source
#[derive(Default)]
pub struct SecretsLoader {
    secret_name: Option<String>,
    region: Option<String>,
    store: Option<Arc<dyn SecretStore>>,
    file: Option<PathBuf>,
    dictionary: Map<String, Value>,
}

impl SecretsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Secret name and region from config, with a file store when
    /// `store_dir` is set
    pub fn from_config(config: &SecretsConfig) -> Self {
        let mut loader = Self::new();
        loader.secret_name = config.secret_name.clone().filter(|s| !s.is_empty());
        loader.region = config.region.clone().filter(|s| !s.is_empty());
        if let Some(dir) = &config.store_dir {
            loader.store = Some(Arc::new(FileSecretStore::new(dir)));
        }
        loader
    }

    pub fn secret_name(mut self, name: impl Into<String>) -> Self {
        self.secret_name = Some(name.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn store(mut self, store: impl SecretStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn dictionary<I, K>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.dictionary
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub async fn load(self) -> Result<Secrets> {
        let mut secrets = Secrets::default();

        if let Some(name) = &self.secret_name {
            let region = self.region.as_deref().unwrap_or(DEFAULT_REGION);
            let store = self.store.as_ref().ok_or_else(|| {
                StacError::Secrets(format!("No secret store configured for '{}'", name))
            })?;
            secrets.extend(store.get(name, region).await?);
            debug!("Loaded secret '{}' from {}", name, region);
        }

        if let Some(path) = &self.file {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                StacError::Secrets(format!("Failed to read {}: {}", path.display(), e))
            })?;
            secrets.extend(read_object(&content, path)?);
        }

        secrets.extend(self.dictionary);
        Ok(secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_empty_loader() {
        let secrets = tokio_test::block_on(SecretsLoader::new().load()).unwrap();
        assert!(secrets.is_empty());
    }

    #[tokio::test]
    async fn test_file_store_round_trip_by_region() {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::new(dir.path());
        store
            .put("spam-credentials", "us-west-2", &object(json!({"FOO": "BAR"})))
            .await
            .unwrap();

        assert!(store.path_for("spam-credentials", "us-west-2").exists());
        assert_eq!(
            store.get("spam-credentials", "us-west-2").await.unwrap(),
            object(json!({"FOO": "BAR"}))
        );
        assert!(matches!(
            store.get("spam-credentials", DEFAULT_REGION).await,
            Err(StacError::Secrets(_))
        ));
    }

    #[tokio::test]
    async fn test_store_uses_default_region() {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::new(dir.path());
        store
            .put("spam-credentials", DEFAULT_REGION, &object(json!({"FOO": "BAR"})))
            .await
            .unwrap();

        let secrets = SecretsLoader::new()
            .secret_name("spam-credentials")
            .store(store)
            .load()
            .await
            .unwrap();
        assert_eq!(secrets.get("FOO"), Some("BAR"));
    }

    #[tokio::test]
    async fn test_priority_order() {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::new(dir.path());
        store
            .put(
                "foo-credentials",
                "us-west-2",
                &object(json!({"FOO": "NO", "STORE_ONLY": "store"})),
            )
            .await
            .unwrap();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"FOO": "BAR", "FILE_ONLY": "file"}}"#).unwrap();

        let secrets = SecretsLoader::new()
            .secret_name("foo-credentials")
            .region("us-west-2")
            .store(store)
            .file(file.path())
            .dictionary([("FOO", json!("SPAM"))])
            .load()
            .await
            .unwrap();

        assert_eq!(secrets.get("FOO"), Some("SPAM"));
        assert_eq!(secrets.get("FILE_ONLY"), Some("file"));
        assert_eq!(secrets.get("STORE_ONLY"), Some("store"));
    }

    #[tokio::test]
    async fn test_values_are_stringified() {
        let secrets = SecretsLoader::new()
            .dictionary([
                ("NONE", Value::Null),
                ("NUMBER", json!(5)),
                ("FLAG", json!(true)),
            ])
            .load()
            .await
            .unwrap();

        assert_eq!(secrets.get("NONE"), Some(""));
        assert_eq!(secrets.get("NUMBER"), Some("5"));
        assert_eq!(secrets.get("FLAG"), Some("true"));
        assert!(secrets.require("NONE").is_err());
        assert_eq!(secrets.require("NUMBER").unwrap(), "5");
    }

    #[tokio::test]
    async fn test_secret_name_without_store() {
        let err = SecretsLoader::new()
            .secret_name("spam-credentials")
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, StacError::Secrets(_)));
    }

    #[tokio::test]
    async fn test_file_must_be_object() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"["FOO"]"#).unwrap();

        let err = SecretsLoader::new().file(file.path()).load().await.unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = TempDir::new().unwrap();
        FileSecretStore::new(dir.path())
            .put("spam-credentials", "us-east-2", &object(json!({"FOO": "BAR"})))
            .await
            .unwrap();

        let config = SecretsConfig {
            secret_name: Some("spam-credentials".to_string()),
            region: Some("us-east-2".to_string()),
            store_dir: Some(dir.path().display().to_string()),
        };
        let secrets = SecretsLoader::from_config(&config).load().await.unwrap();
        assert_eq!(secrets.get("FOO"), Some("BAR"));
    }

    #[tokio::test]
    async fn test_apply_to_config() {
        let secrets = SecretsLoader::new()
            .dictionary([
                ("JIRA_API_USER", json!("secret-user")),
                ("UNRELATED", json!("ignored")),
            ])
            .load()
            .await
            .unwrap();

        let mut loader = ConfigLoader::defaults().unwrap();
        secrets.apply_to(&mut loader);
        let config = loader.into_config().unwrap();

        assert_eq!(config.jira.unwrap().api_user.as_deref(), Some("secret-user"));
    }

    #[tokio::test]
    async fn test_write_json() {
        let secrets = SecretsLoader::new()
            .dictionary([("FOO", json!("BAR"))])
            .load()
            .await
            .unwrap();

        let file = NamedTempFile::new().unwrap();
        secrets.write_json(file.path()).await.unwrap();

        let reloaded = SecretsLoader::new().file(file.path()).load().await.unwrap();
        assert_eq!(reloaded, secrets);
    }
}
