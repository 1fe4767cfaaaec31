//! Route-level tests with a stub renderer standing in for Chromium.

use assert_json_diff::assert_json_include;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use reelscout::cache::ResponseCache;
use reelscout::error::ScrapeResult;
use reelscout::renderer::gateway::RenderGateway;
use reelscout::renderer::{RenderContext, Renderer, WaitPolicy};
use reelscout::rest::{self, AppState};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

struct StubRenderer {
    html: String,
    responses: Vec<String>,
    contexts_created: Arc<AtomicUsize>,
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn new_context(&self, _capture_responses: bool) -> ScrapeResult<Box<dyn RenderContext>> {
        self.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubContext {
            html: self.html.clone(),
            responses: self.responses.clone(),
        }))
    }

    async fn shutdown(&self) -> ScrapeResult<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        0
    }
}

struct StubContext {
    html: String,
    responses: Vec<String>,
}

#[async_trait]
impl RenderContext for StubContext {
    async fn navigate(&mut self, _url: &str, _wait: &WaitPolicy) -> ScrapeResult<()> {
        Ok(())
    }

    async fn html(&self) -> ScrapeResult<String> {
        Ok(self.html.clone())
    }

    async fn current_url(&self) -> ScrapeResult<String> {
        Ok("https://cineverse.stream/".to_string())
    }

    fn observed_responses(&self) -> Vec<String> {
        self.responses.clone()
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        Ok(())
    }
}

fn test_app(html: &str, responses: Vec<String>, ttl: Duration) -> (Router, Arc<AtomicUsize>) {
    let contexts_created = Arc::new(AtomicUsize::new(0));
    let renderer = StubRenderer {
        html: html.to_string(),
        responses,
        contexts_created: Arc::clone(&contexts_created),
    };
    let state = Arc::new(AppState {
        gateway: Arc::new(RenderGateway::with_renderer(Arc::new(renderer))),
        cache: Arc::new(ResponseCache::new(ttl)),
        origin: "https://cineverse.stream".to_string(),
        started_at: Instant::now(),
    });
    (rest::router(state), contexts_created)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

const LISTING_HTML: &str = r#"
    <div class="movie-item">
      <a href="/movie/the-last-voyage"><img src="/posters/voyage.jpg"></a>
      <h2 class="title">The Last Voyage</h2>
      <span class="year">2021</span>
    </div>"#;

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
    let (app, _) = test_app("<html></html>", Vec::new(), Duration::from_secs(3600));
    let (status, body) = get(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "OK");
    assert!(json["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn catalog_repeat_request_is_served_from_cache() {
    let (app, contexts) = test_app(LISTING_HTML, Vec::new(), Duration::from_secs(3600));

    let (status, first) = get(&app, "/api/catalog?page=1&type=movies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contexts.load(Ordering::SeqCst), 1);

    let (status, second) = get(&app, "/api/catalog?page=1&type=movies").await;
    assert_eq!(status, StatusCode::OK);
    // No second render, and the stored payload comes back byte-identical
    // (including the timestamped item identifiers).
    assert_eq!(contexts.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn catalog_rerenders_after_ttl_expiry() {
    let (app, contexts) = test_app(LISTING_HTML, Vec::new(), Duration::ZERO);

    let (status, _) = get(&app, "/api/catalog").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, "/api/catalog").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contexts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn catalog_distinct_params_render_separately() {
    let (app, contexts) = test_app(LISTING_HTML, Vec::new(), Duration::from_secs(3600));

    get(&app, "/api/catalog?page=1").await;
    get(&app, "/api/catalog?page=2").await;
    get(&app, "/api/catalog?page=1&search=voyage").await;
    assert_eq!(contexts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn catalog_zero_matches_returns_empty_defaults() {
    let (app, _) = test_app(
        "<html><body><p>nothing</p></body></html>",
        Vec::new(),
        Duration::from_secs(3600),
    );
    let (status, body) = get(&app, "/api/catalog").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["items"], serde_json::json!([]));
    assert_eq!(json["totalItems"], 0);
    assert_eq!(json["totalPages"], 1);
    assert_eq!(json["page"], 1);
}

#[tokio::test]
async fn catalog_item_shape_is_camel_case() {
    let (app, _) = test_app(LISTING_HTML, Vec::new(), Duration::from_secs(3600));
    let (_, body) = get(&app, "/api/catalog").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_json_include!(
        actual: json.clone(),
        expected: serde_json::json!({
            "page": 1,
            "totalItems": 1,
            "items": [{
                "title": "The Last Voyage",
                "kind": "movie",
                "releaseYear": 2021,
                "detailUrl": "https://cineverse.stream/movie/the-last-voyage",
                "posterUrl": "https://cineverse.stream/posters/voyage.jpg",
            }],
        })
    );
    let item = &json["items"][0];
    assert!(item["id"].as_str().unwrap().starts_with("the-last-voyage-"));
}

#[tokio::test]
async fn content_without_link_is_rejected() {
    let (app, contexts) = test_app("<html></html>", Vec::new(), Duration::from_secs(3600));
    let (status, body) = get(&app, "/api/content/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("link"));
    // Validation happens before the gateway is touched.
    assert_eq!(contexts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn content_nonmatching_page_returns_defaults_not_error() {
    let (app, _) = test_app(
        "<html><body><div>layout changed</div></body></html>",
        Vec::new(),
        Duration::from_secs(3600),
    );
    let (status, body) =
        get(&app, "/api/content/abc?link=https://cineverse.stream/movie/x").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["title"], "Untitled");
    assert_eq!(json["videoLinks"], serde_json::json!([]));
    assert_eq!(json["releaseYear"], Value::Null);
}

#[tokio::test]
async fn content_detail_is_cached_by_link() {
    let html = r#"<h1 class="entry-title">The Last Voyage</h1>
        <iframe src="https://streamtape.example/embed/x"></iframe>"#;
    let (app, contexts) = test_app(html, Vec::new(), Duration::from_secs(3600));

    let uri = "/api/content/abc?link=https://cineverse.stream/movie/x";
    let (_, first) = get(&app, uri).await;
    let (_, second) = get(&app, uri).await;
    assert_eq!(contexts.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);

    let json: Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(json["videoLinks"][0]["provider"], "StreamTape");
    assert_eq!(json["videoLinks"][0]["kind"], "iframe");
}

#[tokio::test]
async fn extract_link_without_iframe_url_is_rejected() {
    let (app, _) = test_app("<html></html>", Vec::new(), Duration::from_secs(3600));

    let (status, body) = post_json(&app, "/api/extract-link", "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("iframeUrl"));

    // A non-JSON body gets the same validation response.
    let (status, _) = post_json(&app, "/api/extract-link", "not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn extract_link_collects_observed_media_and_download_anchors() {
    let html = r#"<html><body>
        <a href="/files/movie.mp4" download>save</a>
        <a href="/about">about</a>
    </body></html>"#;
    let responses = vec![
        "https://cineverse.stream/app.js".to_string(),
        "https://cdn.example/stream/master.m3u8".to_string(),
        "https://cdn.example/poster.jpg".to_string(),
        "https://cdn.example/seg/clip.mp4".to_string(),
    ];
    let (app, _) = test_app(html, responses, Duration::from_secs(3600));

    let (status, body) = post_json(
        &app,
        "/api/extract-link",
        r#"{"iframeUrl":"https://streamtape.example/embed/x"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json["videoUrls"],
        serde_json::json!([
            "https://cdn.example/stream/master.m3u8",
            "https://cdn.example/seg/clip.mp4",
        ])
    );
    // Download anchors are collected verbatim, relative href included.
    assert_eq!(json["downloadLinks"], serde_json::json!(["/files/movie.mp4"]));
    assert!(json["extractedAt"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn extract_link_repeat_request_is_served_from_cache() {
    let (app, contexts) = test_app("<html></html>", Vec::new(), Duration::from_secs(3600));

    let body = r#"{"iframeUrl":"https://streamtape.example/embed/x"}"#;
    let (_, first) = post_json(&app, "/api/extract-link", body).await;
    let (_, second) = post_json(&app, "/api/extract-link", body).await;
    assert_eq!(contexts.load(Ordering::SeqCst), 1);
    // Byte-identical includes the cached extraction timestamp.
    assert_eq!(first, second);
}
