//! Headline digest — Binary Entrypoint
//! Boots the Axum HTTP server on the Shuttle runtime, wiring config, routes and metrics.

use headline_digest::config::ServiceConfig;
use headline_digest::metrics::Metrics;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - HEADLINES_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("HEADLINES_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("headline_digest=info,warn"));

    // Shuttle may already have installed a subscriber; keep it in that case.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = ServiceConfig::load_default()?;
    tracing::info!(
        feed_timeout_ms = cfg.feed_timeout_ms,
        article_timeout_ms = cfg.article_timeout_ms,
        origins = cfg.cors_origins.len(),
        metrics = cfg.metrics_enabled,
        "service config loaded"
    );

    let mut router = headline_digest::app(&cfg)?;
    if cfg.metrics_enabled {
        let metrics = Metrics::init()?;
        router = router.merge(metrics.router());
    }

    Ok(router.into())
}
