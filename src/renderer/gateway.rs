//! Single-flight browser ownership.
//!
//! The gateway owns at most one browser process for the lifetime of the
//! service. Initialization is guarded by a one-shot cell: concurrent first
//! callers all await the same in-flight launch instead of racing into
//! separate browser processes. A failed launch leaves the cell empty so a
//! later request can retry.

use super::chromium::ChromiumRenderer;
use super::{RenderContext, RenderedDocument, Renderer, RendererFactory, WaitPolicy};
use crate::error::ScrapeResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Launches the real Chromium engine.
pub struct ChromiumFactory;

#[async_trait]
impl RendererFactory for ChromiumFactory {
    async fn launch(&self) -> ScrapeResult<Arc<dyn Renderer>> {
        let renderer = ChromiumRenderer::new().await?;
        info!("Chromium renderer initialized");
        Ok(Arc::new(renderer))
    }
}

/// Owns the lazily-launched shared browser and renders pages through it.
pub struct RenderGateway {
    renderer: OnceCell<Arc<dyn Renderer>>,
    factory: Box<dyn RendererFactory>,
}

impl RenderGateway {
    pub fn new(factory: Box<dyn RendererFactory>) -> Self {
        Self {
            renderer: OnceCell::new(),
            factory,
        }
    }

    /// Gateway over an already-running engine. Used by tests to inject a
    /// stub renderer.
    pub fn with_renderer(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer: OnceCell::new_with(Some(renderer)),
            factory: Box::new(ChromiumFactory),
        }
    }

    /// Idempotently get the browser handle, launching it on first use.
    pub async fn ensure(&self) -> ScrapeResult<&Arc<dyn Renderer>> {
        self.renderer
            .get_or_try_init(|| self.factory.launch())
            .await
    }

    /// Render a page in a fresh isolated tab and capture its HTML.
    ///
    /// With `capture_responses` set, the returned document also carries
    /// every outgoing response URL the tab observed during the load.
    pub async fn render(
        &self,
        url: &str,
        wait: &WaitPolicy,
        capture_responses: bool,
    ) -> ScrapeResult<RenderedDocument> {
        let renderer = self.ensure().await?;
        let mut ctx: Box<dyn RenderContext> = renderer.new_context(capture_responses).await?;
        let started = Instant::now();

        if let Err(e) = ctx.navigate(url, wait).await {
            let _ = ctx.close().await;
            return Err(e);
        }
        let html = match ctx.html().await {
            Ok(html) => html,
            Err(e) => {
                let _ = ctx.close().await;
                return Err(e);
            }
        };
        let final_url = ctx
            .current_url()
            .await
            .unwrap_or_else(|_| url.to_string());
        let response_urls = ctx.observed_responses();
        let _ = ctx.close().await;

        let load_time_ms = started.elapsed().as_millis() as u64;
        debug!(%url, load_time_ms, "page rendered");

        Ok(RenderedDocument {
            html,
            final_url,
            response_urls,
            load_time_ms,
        })
    }

    /// Best-effort browser close. No-op if the browser was never launched.
    pub async fn shutdown(&self) -> ScrapeResult<()> {
        match self.renderer.get() {
            Some(renderer) => renderer.shutdown().await,
            None => Ok(()),
        }
    }

    /// Number of currently open tabs (0 before first launch).
    pub fn active_contexts(&self) -> usize {
        self.renderer
            .get()
            .map(|r| r.active_contexts())
            .unwrap_or(0)
    }
}
