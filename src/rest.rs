// Copyright 2026 Reelscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API.
//!
//! Three data endpoints share one pipeline: derive a cache key, return a
//! fresh cached payload verbatim, otherwise render the page through the
//! gateway, extract, store, and return. Extraction runs in
//! `spawn_blocking` because the scraper types are `!Send`.

use crate::cache::{self, ResponseCache};
use crate::error::ScrapeError;
use crate::extract::{self, ExtractedLinks};
use crate::renderer::gateway::RenderGateway;
use crate::renderer::WaitPolicy;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use url::Url;

/// Process-scoped dependencies, injected into every handler.
pub struct AppState {
    pub gateway: Arc<RenderGateway>,
    pub cache: Arc<ResponseCache>,
    pub origin: String,
    pub started_at: Instant,
}

/// Maps the error taxonomy to status codes at the route boundary.
pub struct ApiError(pub ScrapeError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            ScrapeError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            ScrapeError::Render(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "failed to fetch content", "details": msg }),
            ),
            ScrapeError::Extraction(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "failed to parse content", "details": msg }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ScrapeError> for ApiError {
    fn from(e: ScrapeError) -> Self {
        Self(e)
    }
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/catalog", get(catalog))
        .route("/api/content/:id", get(content))
        .route("/api/extract-link", post(extract_link))
        .layer(cors)
        .with_state(state)
}

/// Serve the API until the process receives an interrupt.
///
/// In-flight requests are not drained on shutdown; the caller closes the
/// browser afterwards.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::select! {
        result = async { axum::serve(listener, app).await } => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize, Default)]
struct CatalogParams {
    page: Option<u32>,
    search: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

async fn catalog(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CatalogParams>,
) -> Result<Json<Value>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let search = params.search.unwrap_or_default();
    let kind = normalize_kind(params.kind.as_deref());

    let key = cache::catalog_key(page, &search, kind);
    if let Some(hit) = state.cache.get(&key).await {
        debug!(%key, "catalog cache hit");
        return Ok(Json(hit));
    }

    let url = listing_url(&state.origin, page, &search, kind)?;
    info!(%url, page, kind, "scraping catalog");
    let doc = state
        .gateway
        .render(&url, &WaitPolicy::NetworkIdle, false)
        .await?;

    let origin = state.origin.clone();
    let record = tokio::task::spawn_blocking(move || {
        extract::extract_catalog(&doc.html, &origin, page)
    })
    .await
    .map_err(|e| ScrapeError::Extraction(format!("extraction task failed: {e}")))?;

    let value = serde_json::to_value(&record)
        .map_err(|e| ScrapeError::Extraction(format!("serialization failed: {e}")))?;
    state.cache.set(&key, value.clone()).await;
    Ok(Json(value))
}

#[derive(Debug, Deserialize, Default)]
struct ContentParams {
    link: Option<String>,
}

async fn content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ContentParams>,
) -> Result<Json<Value>, ApiError> {
    let link = match params.link.as_deref().map(str::trim) {
        Some(link) if !link.is_empty() => link.to_string(),
        _ => {
            return Err(ScrapeError::Validation(
                "missing required 'link' query parameter".to_string(),
            )
            .into());
        }
    };

    let key = cache::detail_key(&link);
    if let Some(hit) = state.cache.get(&key).await {
        debug!(%key, "detail cache hit");
        return Ok(Json(hit));
    }

    info!(%link, %id, "scraping content detail");
    let doc = state
        .gateway
        .render(&link, &WaitPolicy::NetworkIdle, false)
        .await?;

    let origin = state.origin.clone();
    let record =
        tokio::task::spawn_blocking(move || extract::extract_detail(&doc.html, &origin))
            .await
            .map_err(|e| ScrapeError::Extraction(format!("extraction task failed: {e}")))?;

    let value = serde_json::to_value(&record)
        .map_err(|e| ScrapeError::Extraction(format!("serialization failed: {e}")))?;
    state.cache.set(&key, value.clone()).await;
    Ok(Json(value))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ExtractLinkBody {
    iframe_url: Option<String>,
}

async fn extract_link(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ExtractLinkBody>>,
) -> Result<Json<Value>, ApiError> {
    let iframe_url = body
        .and_then(|Json(b)| b.iframe_url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            ApiError(ScrapeError::Validation(
                "missing required 'iframeUrl' field".to_string(),
            ))
        })?;

    let key = cache::player_key(&iframe_url);
    if let Some(hit) = state.cache.get(&key).await {
        debug!(%key, "player cache hit");
        return Ok(Json(hit));
    }

    info!(url = %iframe_url, "extracting player links");
    let doc = state
        .gateway
        .render(&iframe_url, &WaitPolicy::NetworkIdle, true)
        .await?;

    let video_urls: Vec<String> = {
        let mut seen = std::collections::HashSet::new();
        doc.response_urls
            .iter()
            .filter(|u| extract::is_media_url(u))
            .filter(|u| seen.insert(u.to_string()))
            .cloned()
            .collect()
    };

    let html = doc.html;
    let download_links =
        tokio::task::spawn_blocking(move || extract::extract_download_links(&html))
            .await
            .map_err(|e| ScrapeError::Extraction(format!("extraction task failed: {e}")))?;

    let record = ExtractedLinks {
        video_urls,
        download_links,
        extracted_at: Utc::now(),
    };
    let value = serde_json::to_value(&record)
        .map_err(|e| ScrapeError::Extraction(format!("serialization failed: {e}")))?;
    state.cache.set(&key, value.clone()).await;
    Ok(Json(value))
}

// ── Helpers ─────────────────────────────────────────────────────

fn normalize_kind(kind: Option<&str>) -> &'static str {
    match kind {
        Some("movies") => "movies",
        Some("series") => "series",
        _ => "all",
    }
}

/// Build the listing URL for a catalog scrape.
fn listing_url(origin: &str, page: u32, search: &str, kind: &str) -> Result<String, ScrapeError> {
    let mut url = Url::parse(origin)
        .map_err(|e| ScrapeError::Render(format!("invalid catalog origin {origin}: {e}")))?;

    let path = match kind {
        "movies" => format!("/movies/page/{page}"),
        "series" => format!("/series/page/{page}"),
        _ => format!("/page/{page}"),
    };
    url.set_path(&path);
    if !search.is_empty() {
        url.query_pairs_mut().append_pair("s", search);
    }
    Ok(url.to_string())
}
