use anyhow::Context as _;
use apiroute_http::ClientConfig;
use std::path::{Path, PathBuf};

pub fn default_catalog_path() -> anyhow::Result<PathBuf> {
    let base = if let Ok(v) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(v)
    } else {
        let home = std::env::var("HOME").context("HOME is not set")?;
        PathBuf::from(home).join(".config")
    };
    Ok(base.join("apiroute").join("catalog.yaml"))
}

/// Load the catalog at `path`; a missing file yields an empty catalog.
pub fn load_catalog(path: &Path) -> anyhow::Result<ClientConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "catalog not found; using empty catalog");
        return Ok(ClientConfig::default());
    }
    ClientConfig::load(path).with_context(|| format!("load catalog {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_catalog_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_catalog(&dir.path().join("nope.yaml")).expect("empty catalog");
        assert!(cfg.routes.is_empty());
        assert!(cfg.stubs.is_empty());
        assert_eq!(cfg.base_url, "");
    }

    #[test]
    fn invalid_catalog_is_reported_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "routes: [not, a, map]").expect("write");
        let err = load_catalog(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.yaml"));
    }
}
