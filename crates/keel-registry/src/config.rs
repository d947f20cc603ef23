use std::path::Path;
use std::time::Duration;

use keel_catalog::CatalogQuota;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Registry settings shared by every repository context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Address clients pull from; prefixed to every recorded pull spec.
    pub registry_addr: String,
    /// Accept Docker schema2 manifests on push.
    pub accept_schema2: bool,
    /// How long a blob stays confirmed for a repository in the layer cache.
    pub blob_repository_cache_ttl_secs: u64,
    /// Limits applied by the embedded catalog.
    pub quota: CatalogQuota,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_addr: "127.0.0.1:5000".into(),
            accept_schema2: true,
            blob_repository_cache_ttl_secs: 600,
            quota: CatalogQuota::default(),
        }
    }
}

impl RegistryConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> RegistryResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| RegistryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), registry_addr = %config.registry_addr, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> RegistryResult<()> {
        if self.registry_addr.trim().is_empty() {
            return Err(RegistryError::Config("registry_addr must not be empty".into()));
        }
        Ok(())
    }

    pub fn blob_repository_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.blob_repository_cache_ttl_secs)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> RegistryResult<String> {
        toml::to_string_pretty(self).map_err(|e| RegistryError::Config(e.to_string()))
    }
}
