use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Environment variable holding the base URL prepended to every route template.
pub const API_BASE_ENV: &str = "API_BASE";

/// Logical path key -> URL template (`/users/:id`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RouteTable(BTreeMap<String, String>);

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.0.insert(key.into(), template.into());
    }

    #[must_use]
    pub fn template(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Logical path key -> canned response returned instead of a live call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct StubTable(BTreeMap<String, Value>);

impl StubTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for StubTable {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Client configuration: base URL, route/stub catalog and transport limits.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Prefix for every route template. Overridden by `API_BASE` when set.
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub routes: RouteTable,

    #[serde(default)]
    pub stubs: StubTable,

    /// Per-request timeout in seconds. Unset or `0` means no deadline.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Maximum response body size (bytes). Unset means unlimited.
    #[serde(default)]
    pub max_response_bytes: Option<usize>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, routes: RouteTable, stubs: StubTable) -> Self {
        Self {
            base_url: base_url.into(),
            routes,
            stubs,
            timeout_secs: None,
            max_response_bytes: None,
        }
    }

    /// Parse a catalog document. JSON is accepted as well, being a subset of YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid catalog.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Load a catalog file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg = Self::from_yaml_str(&text).map_err(|e| {
            ApiError::Config(format!("failed to parse catalog '{}': {e}", path.display()))
        })?;
        debug!(
            path = %path.display(),
            routes = cfg.routes.len(),
            stubs = cfg.stubs.len(),
            "loaded route catalog"
        );
        Ok(cfg)
    }

    /// Apply `API_BASE` from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides using a caller-provided lookup.
    #[must_use]
    pub fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup(API_BASE_ENV) {
            self.base_url = base;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_yaml_catalog() {
        let cfg = ClientConfig::from_yaml_str(
            r"
baseUrl: https://api.example.com
routes:
  user: /users/:id
  empty: '  '
stubs:
  user:
    id: 1
    name: stub
timeoutSecs: 5
",
        )
        .expect("catalog");

        assert_eq!(cfg.base_url, "https://api.example.com");
        assert_eq!(cfg.routes.template("user"), Some("/users/:id"));
        assert_eq!(cfg.routes.template("empty"), Some("  "));
        assert_eq!(cfg.stubs.get("user"), Some(&json!({"id": 1, "name": "stub"})));
        assert_eq!(cfg.timeout_secs, Some(5));
        assert_eq!(cfg.max_response_bytes, None);
    }

    #[test]
    fn parses_json_catalog() {
        let cfg = ClientConfig::from_yaml_str(
            r#"{"routes": {"posts": "/posts"}, "maxResponseBytes": 1024}"#,
        )
        .expect("catalog");
        assert_eq!(cfg.base_url, "");
        assert_eq!(cfg.routes.template("posts"), Some("/posts"));
        assert!(cfg.stubs.is_empty());
        assert_eq!(cfg.max_response_bytes, Some(1024));
    }

    #[test]
    fn api_base_overrides_base_url() {
        let cfg = ClientConfig::new("https://file.example", RouteTable::new(), StubTable::new())
            .with_env_lookup(|k| (k == API_BASE_ENV).then(|| "https://env.example".to_string()));
        assert_eq!(cfg.base_url, "https://env.example");

        let cfg = ClientConfig::new("https://file.example", RouteTable::new(), StubTable::new())
            .with_env_lookup(|_| None);
        assert_eq!(cfg.base_url, "https://file.example");
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ClientConfig::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ApiError::Io(_)));
    }
}
