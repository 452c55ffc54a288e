//! Caching/revalidation hints forwarded with each request.
//!
//! There is no response cache on this side; the hints are rendered into a `Cache-Control`
//! request header so upstream caches and the origin can act on them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    NoStore,
    ForceCache,
}

/// `number | false`: revalidate after N seconds, or never.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RevalidateRepr", into = "RevalidateRepr")]
pub enum Revalidate {
    After(u64),
    Never,
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum RevalidateRepr {
    Seconds(u64),
    Flag(bool),
}

impl TryFrom<RevalidateRepr> for Revalidate {
    type Error = String;

    fn try_from(value: RevalidateRepr) -> Result<Self, Self::Error> {
        match value {
            RevalidateRepr::Seconds(secs) => Ok(Self::After(secs)),
            RevalidateRepr::Flag(false) => Ok(Self::Never),
            RevalidateRepr::Flag(true) => {
                Err("revalidate must be a number of seconds or false".to_string())
            }
        }
    }
}

impl From<Revalidate> for RevalidateRepr {
    fn from(value: Revalidate) -> Self {
        match value {
            Revalidate::After(secs) => Self::Seconds(secs),
            Revalidate::Never => Self::Flag(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct NextOptions {
    pub revalidate: Revalidate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransportOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NextOptions>,
}

impl TransportOptions {
    #[must_use]
    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_revalidate(mut self, revalidate: Revalidate) -> Self {
        self.next = Some(NextOptions { revalidate });
        self
    }

    /// Render the hints as a `Cache-Control` header value, if any apply.
    #[must_use]
    pub fn cache_control(&self) -> Option<String> {
        let mut directives: Vec<String> = Vec::new();
        match self.cache {
            Some(CacheMode::NoStore) => directives.push("no-store".to_string()),
            Some(CacheMode::ForceCache) => directives.push("max-stale".to_string()),
            None => {}
        }
        if let Some(NextOptions {
            revalidate: Revalidate::After(secs),
        }) = self.next
        {
            directives.push(format!("max-age={secs}"));
        }

        if directives.is_empty() {
            None
        } else {
            Some(directives.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_wire_shape() {
        let opts: TransportOptions =
            serde_json::from_value(json!({"cache": "force-cache", "next": {"revalidate": 60}}))
                .expect("options");
        assert_eq!(opts.cache, Some(CacheMode::ForceCache));
        assert_eq!(
            opts.next.map(|n| n.revalidate),
            Some(Revalidate::After(60))
        );

        let opts: TransportOptions =
            serde_json::from_value(json!({"next": {"revalidate": false}})).expect("options");
        assert_eq!(opts.next.map(|n| n.revalidate), Some(Revalidate::Never));

        let err = serde_json::from_value::<TransportOptions>(json!({"next": {"revalidate": true}}));
        assert!(err.is_err());
    }

    #[test]
    fn cache_control_rendering() {
        assert_eq!(TransportOptions::default().cache_control(), None);
        assert_eq!(
            TransportOptions::default()
                .with_cache(CacheMode::NoStore)
                .cache_control()
                .as_deref(),
            Some("no-store")
        );
        assert_eq!(
            TransportOptions::default()
                .with_cache(CacheMode::ForceCache)
                .with_revalidate(Revalidate::After(30))
                .cache_control()
                .as_deref(),
            Some("max-stale, max-age=30")
        );
        assert_eq!(
            TransportOptions::default()
                .with_revalidate(Revalidate::Never)
                .cache_control(),
            None
        );
    }
}
