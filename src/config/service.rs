// src/config/service.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{env, fs, path::Path, path::PathBuf};

pub const ENV_CONFIG_PATH: &str = "HEADLINES_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/headlines.toml";

const ENV_FEED_TIMEOUT_MS: &str = "HEADLINES_FEED_TIMEOUT_MS";
const ENV_ARTICLE_TIMEOUT_MS: &str = "HEADLINES_ARTICLE_TIMEOUT_MS";
const ENV_CORS_ORIGINS: &str = "HEADLINES_CORS_ORIGINS";
const ENV_METRICS: &str = "HEADLINES_METRICS";

fn default_timeout_ms() -> u64 {
    5_000
}
fn default_max_body_bytes() -> usize {
    crate::ingest::providers::DEFAULT_MAX_BODY_BYTES
}
fn default_user_agent() -> String {
    concat!("headline-digest/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_cors_origins() -> Vec<String> {
    [
        "http://localhost:8080",
        "http://localhost:5173",
        "http://localhost:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Timeout for the feed request, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub feed_timeout_ms: u64,
    /// Timeout for each article request, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub article_timeout_ms: u64,
    /// Largest feed or article body read before giving up.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Origins allowed by CORS (credentials included).
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Install the Prometheus recorder and expose `/metrics`.
    #[serde(default)]
    pub metrics_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            feed_timeout_ms: default_timeout_ms(),
            article_timeout_ms: default_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
            cors_origins: default_cors_origins(),
            metrics_enabled: false,
        }
    }
}

impl ServiceConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading service config from {}", path.display()))?;
        let cfg: ServiceConfig = toml::from_str(&data)
            .with_context(|| format!("parsing service config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $HEADLINES_CONFIG_PATH (must exist when set)
    /// 2) config/headlines.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
            if pb.exists() {
                Self::load_from_file(&pb)?
            } else {
                Self::default()
            }
        };
        base.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(ms) = parse_ms_env(ENV_FEED_TIMEOUT_MS)? {
            self.feed_timeout_ms = ms;
        }
        if let Some(ms) = parse_ms_env(ENV_ARTICLE_TIMEOUT_MS)? {
            self.article_timeout_ms = ms;
        }
        if let Ok(raw) = env::var(ENV_CORS_ORIGINS) {
            self.cors_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(raw) = env::var(ENV_METRICS) {
            self.metrics_enabled = matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true");
        }
        Ok(self.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if self.feed_timeout_ms == 0 {
            self.feed_timeout_ms = default_timeout_ms();
        }
        if self.article_timeout_ms == 0 {
            self.article_timeout_ms = default_timeout_ms();
        }
        if self.max_body_bytes == 0 {
            self.max_body_bytes = default_max_body_bytes();
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_millis(self.feed_timeout_ms)
    }

    pub fn article_timeout(&self) -> Duration {
        Duration::from_millis(self.article_timeout_ms)
    }
}

fn parse_ms_env(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{name} must be a whole number of milliseconds")),
        Err(_) => Ok(None),
    }
}
