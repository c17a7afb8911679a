use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header::HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::ingest::types::Headline;
use crate::ingest::Aggregator;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
        }
    }
}

pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/sources", get(list_sources))
        .route("/api/headlines", get(headlines))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// CORS for the configured origins. Invalid entries are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct HeadlinesResponse {
    pub headlines: Vec<Headline>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct SourcesResponse {
    pub sources: Vec<String>,
    pub default: String,
}

/// Feed failure surfaced to the client as `500 {"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    message: String,
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self {
            message: format!("{e:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Last `source` value in the query string; never rejects the request.
fn source_param(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> Option<String> {
    match query {
        Ok(Query(pairs)) => pairs
            .into_iter()
            .rev()
            .find_map(|(k, v)| (k == "source").then_some(v)),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unreadable query string, using default source");
            None
        }
    }
}

async fn headlines(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<HeadlinesResponse>, ApiError> {
    let registry = state.aggregator.registry();
    let requested = source_param(query);
    let source = requested.as_deref().unwrap_or(registry.default_key());
    let headlines = state.aggregator.aggregate(source).await?;
    Ok(Json(HeadlinesResponse { headlines }))
}

async fn list_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    let registry = state.aggregator.registry();
    Json(SourcesResponse {
        sources: registry.keys().map(String::from).collect(),
        default: registry.default_key().to_string(),
    })
}
