//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide), plus the
//! `RenderGateway` that owns the single lazily-launched browser.

pub mod chromium;
pub mod gateway;

use crate::error::ScrapeResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Fixed desktop user-agent set on every page before navigation.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Default timeout for selector waits.
pub const DEFAULT_SELECTOR_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for the page after navigation completes.
#[derive(Debug, Clone)]
pub enum WaitPolicy {
    /// Wait for navigation to finish, then a short settle delay so late
    /// responses and client-side rendering land.
    NetworkIdle,
    /// Poll until a CSS selector matches, up to the timeout.
    Selector { css: String, timeout: Duration },
}

impl WaitPolicy {
    /// Selector wait with the default 10-second timeout.
    pub fn selector(css: impl Into<String>) -> Self {
        Self::Selector {
            css: css.into(),
            timeout: DEFAULT_SELECTOR_TIMEOUT,
        }
    }
}

/// Result of rendering a page in an isolated tab.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Fully rendered HTML.
    pub html: String,
    /// The URL after any redirects.
    pub final_url: String,
    /// Outgoing response URLs observed during the load, in arrival order.
    /// Empty unless the context was created with response capture enabled.
    pub response_urls: Vec<String>,
    /// Time taken to render in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new isolated browser context (tab). When
    /// `capture_responses` is set, the tab records every outgoing
    /// response URL it observes.
    async fn new_context(&self, capture_responses: bool) -> ScrapeResult<Box<dyn RenderContext>>;
    /// Best-effort shut down of the browser process.
    async fn shutdown(&self) -> ScrapeResult<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL and wait according to the policy.
    async fn navigate(&mut self, url: &str, wait: &WaitPolicy) -> ScrapeResult<()>;
    /// Get the full rendered page HTML.
    async fn html(&self) -> ScrapeResult<String>;
    /// Get the current URL.
    async fn current_url(&self) -> ScrapeResult<String>;
    /// Response URLs observed so far (empty without capture).
    fn observed_responses(&self) -> Vec<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> ScrapeResult<()>;
}

/// Launches a browser engine on first use.
///
/// The gateway holds a factory rather than an engine so tests can inject
/// a stub renderer without a Chromium binary present.
#[async_trait]
pub trait RendererFactory: Send + Sync {
    async fn launch(&self) -> ScrapeResult<Arc<dyn Renderer>>;
}
