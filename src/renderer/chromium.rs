//! Chromium-based renderer using chromiumoxide.

use super::{RenderContext, Renderer, WaitPolicy, USER_AGENT};
use crate::error::{ScrapeError, ScrapeResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::EventResponseReceived;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;

/// Hard ceiling on a single navigation.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Settle delay after navigation so late responses land.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Poll interval for selector waits.
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. REELSCOUT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("REELSCOUT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.reelscout/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".reelscout/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".reelscout/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".reelscout/chromium/chrome-linux64/chrome"),
                home.join(".reelscout/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    if let Ok(path) = which::which("google-chrome") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium-browser") {
        return Some(path);
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer.
///
/// The browser sits behind a mutex so shutdown can close it in place;
/// contexts hold their own `Page` handles and never touch the lock after
/// creation.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    pub async fn new() -> ScrapeResult<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            ScrapeError::Render(
                "Chromium not found. Set REELSCOUT_CHROMIUM_PATH or install Chrome.".to_string(),
            )
        })?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| ScrapeError::Render(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Render(format!("failed to launch Chromium: {e}")))?;

        // Drain the CDP event handler for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self, capture_responses: bool) -> ScrapeResult<Box<dyn RenderContext>> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| ScrapeError::Render(format!("failed to create new page: {e}")))?
        };

        let params = SetUserAgentOverrideParams::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ScrapeError::Render(format!("failed to build user-agent params: {e}")))?;
        page.set_user_agent(params)
            .await
            .map_err(|e| ScrapeError::Render(format!("failed to set user agent: {e}")))?;

        let responses = Arc::new(StdMutex::new(Vec::new()));
        let collector = if capture_responses {
            let mut events = page
                .event_listener::<EventResponseReceived>()
                .await
                .map_err(|e| {
                    ScrapeError::Render(format!("failed to attach response listener: {e}"))
                })?;
            let sink = Arc::clone(&responses);
            Some(tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    if let Ok(mut urls) = sink.lock() {
                        urls.push(event.response.url.clone());
                    }
                }
            }))
        } else {
            None
        };

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            responses,
            collector,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> ScrapeResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| ScrapeError::Render(format!("browser close failed: {e}")))?;
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    responses: Arc<StdMutex<Vec<String>>>,
    collector: Option<tokio::task::JoinHandle<()>>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    async fn wait_for_selector(&self, css: &str, timeout: Duration) -> ScrapeResult<()> {
        let probe = format!(
            "document.querySelector({}) !== null",
            serde_json::to_string(css)
                .map_err(|e| ScrapeError::Render(format!("bad selector {css:?}: {e}")))?
        );
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let found = self
                .page
                .evaluate(probe.as_str())
                .await
                .ok()
                .and_then(|r| r.into_value::<bool>().ok())
                .unwrap_or(false);
            if found {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ScrapeError::Render(format!(
                    "selector {css:?} did not appear within {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, wait: &WaitPolicy) -> ScrapeResult<()> {
        let result = tokio::time::timeout(NAVIGATION_TIMEOUT, self.page.goto(url)).await;
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(ScrapeError::Render(format!("navigation failed for {url}: {e}")));
            }
            Err(_) => {
                return Err(ScrapeError::Render(format!(
                    "navigation to {url} timed out after {}ms",
                    NAVIGATION_TIMEOUT.as_millis()
                )));
            }
        }

        match wait {
            WaitPolicy::NetworkIdle => {
                let _ = self.page.wait_for_navigation().await;
                tokio::time::sleep(SETTLE_DELAY).await;
            }
            WaitPolicy::Selector { css, timeout } => {
                self.wait_for_selector(css, *timeout).await?;
            }
        }
        Ok(())
    }

    async fn html(&self) -> ScrapeResult<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .map_err(|e| ScrapeError::Render(format!("failed to get HTML: {e}")))?;

        result
            .into_value()
            .map_err(|e| ScrapeError::Render(format!("failed to convert HTML result: {e:?}")))
    }

    async fn current_url(&self) -> ScrapeResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| ScrapeError::Render(format!("failed to get URL: {e}")))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    fn observed_responses(&self) -> Vec<String> {
        self.responses
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_default()
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        if let Some(collector) = self.collector {
            collector.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::Renderer;

    #[test]
    fn test_find_chromium_env_override_must_exist() {
        // A nonexistent override path is ignored rather than returned.
        std::env::set_var("REELSCOUT_CHROMIUM_PATH", "/nonexistent/chrome-binary");
        let found = find_chromium();
        std::env::remove_var("REELSCOUT_CHROMIUM_PATH");
        if let Some(path) = found {
            assert_ne!(path, PathBuf::from("/nonexistent/chrome-binary"));
        }
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_render_and_selector_wait() {
        let renderer = ChromiumRenderer::new().await.expect("launch failed");
        let mut ctx = renderer.new_context(false).await.expect("context failed");

        ctx.navigate(
            "data:text/html,<h1>Hello</h1><p>World</p>",
            &WaitPolicy::selector("h1"),
        )
        .await
        .expect("navigation failed");

        let html = ctx.html().await.expect("html failed");
        assert!(html.contains("<h1>Hello</h1>"));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);

        renderer.shutdown().await.expect("shutdown failed");
    }
}
