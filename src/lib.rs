// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;

pub use crate::api::create_router as router;
pub use crate::ingest::types::Headline;
pub use crate::ingest::Aggregator;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

use crate::config::ServiceConfig;
use crate::ingest::providers::{HttpArticleExtractor, HttpFeedFetcher};
use crate::ingest::registry::SourceRegistry;

/// Wire the production aggregator (builtin registry, HTTP feed + article fetchers).
pub fn build_aggregator(cfg: &ServiceConfig) -> Result<Aggregator> {
    let client = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .build()
        .context("building http client")?;

    Ok(Aggregator::new(
        Arc::new(SourceRegistry::builtin()),
        Arc::new(
            HttpFeedFetcher::new(client.clone(), cfg.feed_timeout())
                .with_max_body_bytes(cfg.max_body_bytes),
        ),
        Arc::new(
            HttpArticleExtractor::new(client, cfg.article_timeout())
                .with_max_body_bytes(cfg.max_body_bytes),
        ),
    ))
}

/// Full router as served by the binary, minus `/metrics`.
pub fn app(cfg: &ServiceConfig) -> Result<Router> {
    let aggregator = build_aggregator(cfg)?;
    Ok(api::create_router(
        api::AppState::new(aggregator),
        &cfg.cors_origins,
    ))
}
