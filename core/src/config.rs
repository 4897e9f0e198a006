//! Connection settings and the on-disk connection-info file.
//!
//! The file layout is `{"HOST": {"URL": ..., "APIKEY": ...}, "SITES": {...}}`.
//! `SITES` is a free-form name to site id table kept for callers.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::transport::Timeouts;

/// Environment variable overriding `HOST.URL`.
pub const URL_ENV: &str = "PLEASANTER_URL";
/// Environment variable overriding `HOST.APIKEY`.
pub const API_KEY_ENV: &str = "PLEASANTER_API_KEY";

/// Immutable connection settings: base URL, API key, timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    base_url: String,
    api_key: String,
    timeouts: Timeouts,
}

impl Connection {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// `{base}/api/items/{id}/{action}`
    pub fn item_url(&self, id: &str, action: &str) -> String {
        format!("{}/api/items/{id}/{action}", self.base_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "APIKEY")]
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(rename = "HOST")]
    pub host: HostInfo,
    #[serde(rename = "SITES", default)]
    pub sites: BTreeMap<String, Value>,
}

impl ConnectionInfo {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            host: HostInfo {
                url: url.to_string(),
                api_key: api_key.to_string(),
            },
            sites: BTreeMap::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the file pretty-printed. Refuses empty URL or key.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.validate()?;
        let path = path.as_ref();
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!(path = %path.display(), "wrote connection info");
        Ok(())
    }

    /// Apply `PLEASANTER_URL` / `PLEASANTER_API_KEY` when set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(URL_ENV).filter(|v| !v.is_empty()) {
            self.host.url = url;
        }
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.host.api_key = key;
        }
        self
    }

    /// Site id registered under `name` in `SITES`, if any.
    pub fn site_id(&self, name: &str) -> Option<String> {
        match self.sites.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn connection(&self) -> Result<Connection, ConfigError> {
        self.validate()?;
        Ok(Connection::new(&self.host.url, &self.host.api_key))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.url.trim().is_empty() {
            return Err(ConfigError::MissingField("HOST.URL"));
        }
        if self.host.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("HOST.APIKEY"));
        }
        Ok(())
    }
}
