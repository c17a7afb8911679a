// src/ingest/registry.rs
//! Static source registry: source key → feed URL, with one registered key acting as
//! the fallback for anything unknown.

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

pub const DEFAULT_SOURCE: &str = "bbc";

const BUILTIN_FEEDS: [(&str, &str); 3] = [
    ("bbc", "http://feeds.bbci.co.uk/news/world/rss.xml"),
    (
        "reuters",
        "https://ir.thomsonreuters.com/rss/news-releases.xml?items=15",
    ),
    ("npr", "https://feeds.npr.org/1001/rss.xml"),
];

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    feeds: BTreeMap<String, String>,
    default_key: String,
    default_url: String,
}

impl SourceRegistry {
    /// Build a registry; `default_key` must be one of the registered keys.
    pub fn new<I, K, V>(entries: I, default_key: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let feeds: BTreeMap<String, String> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let default_url = feeds
            .get(default_key)
            .cloned()
            .ok_or_else(|| anyhow!("default source '{default_key}' is not registered"))?;
        Ok(Self {
            feeds,
            default_key: default_key.to_string(),
            default_url,
        })
    }

    /// The bbc / reuters / npr registry served in production.
    pub fn builtin() -> Self {
        let feeds: BTreeMap<String, String> = BUILTIN_FEEDS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            feeds,
            default_key: DEFAULT_SOURCE.to_string(),
            default_url: BUILTIN_FEEDS[0].1.to_string(),
        }
    }

    /// Feed URL for `source_key`, or the default source's URL when unregistered.
    pub fn resolve(&self, source_key: &str) -> &str {
        self.feeds
            .get(source_key)
            .map(String::as_str)
            .unwrap_or(&self.default_url)
    }

    /// The key whose URL `resolve` returns.
    pub fn resolve_key<'a>(&'a self, source_key: &'a str) -> &'a str {
        if self.feeds.contains_key(source_key) {
            source_key
        } else {
            &self.default_key
        }
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.feeds.keys().map(String::as_str)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
