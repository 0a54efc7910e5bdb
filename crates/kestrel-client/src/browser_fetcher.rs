use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use kestrel_core::error::AppError;
use kestrel_core::traits::Fetcher;
use tokio::time::Instant;

/// How the browser loads a search page before its DOM is read.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Upper bound for loading a page and reading its DOM.
    pub timeout: Duration,
    /// Scroll passes to trigger lazy-loaded listings. `0` disables scrolling.
    pub scroll_passes: u32,
    /// Pause after each scroll pass.
    pub scroll_pause: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            scroll_passes: 5,
            scroll_pause: Duration::from_millis(1500),
        }
    }
}

/// Headless-browser fetcher using Chromium via the Chrome DevTools Protocol.
///
/// Many storefronts assemble search results with JavaScript and load the
/// lower half of the grid only after scrolling. This fetcher renders the
/// page, scrolls it `scroll_passes` times, and returns the resulting DOM.
///
/// A single Chromium process is shared by all clones; each fetch opens
/// and closes its own tab.
#[derive(Clone)]
pub struct BrowserFetcher {
    browser: Arc<Browser>,
    options: BrowserOptions,
}

impl BrowserFetcher {
    pub async fn new() -> Result<Self, AppError> {
        Self::with_options(BrowserOptions::default()).await
    }

    pub async fn with_options(options: BrowserOptions) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .window_size(1920, 1080);

        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled for the connection to make progress.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            options,
        })
    }

    /// `CHROME_BIN` if set and present, else the first well-known install path.
    fn find_chrome_binary() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(p);
            if path.exists() {
                return Some(path);
            }
        }

        [
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }

    /// Open a tab, load and scroll it, and read its DOM.
    ///
    /// Navigation and loading share one deadline. The tab is closed once
    /// loading ends, including when the deadline cuts it short.
    async fn render(&self, url: &str) -> Result<String, AppError> {
        let timeout_secs = self.options.timeout.as_secs();
        let deadline = Instant::now() + self.options.timeout;

        let page = tokio::time::timeout_at(deadline, self.browser.new_page(url))
            .await
            .map_err(|_| AppError::Timeout(timeout_secs))?
            .map_err(|e| AppError::HttpError(format!("Failed to navigate to {url}: {e}")))?;

        let tab = page.clone();
        run_then_close(deadline, timeout_secs, self.load(&page), async move {
            if let Err(e) = tab.close().await {
                tracing::debug!("Failed to close browser tab: {e}");
            }
        })
        .await
    }

    async fn load(&self, page: &Page) -> Result<String, AppError> {
        page.find_element("body")
            .await
            .map_err(|e| AppError::HttpError(format!("Page did not render body: {e}")))?;

        for pass in 0..self.options.scroll_passes {
            page.evaluate("window.scrollBy(0, window.innerHeight)")
                .await
                .map_err(|e| AppError::BrowserError(format!("Scroll pass {pass} failed: {e}")))?;
            tokio::time::sleep(self.options.scroll_pause).await;
        }
        if self.options.scroll_passes > 0 {
            page.evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await
                .map_err(|e| AppError::BrowserError(format!("Final scroll failed: {e}")))?;
            tokio::time::sleep(self.options.scroll_pause).await;
        }

        page.content()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read page content: {e}")))
    }
}

/// Drive `body` until it finishes or `deadline` passes, then await `close`.
async fn run_then_close<T, B, C>(
    deadline: Instant,
    timeout_secs: u64,
    body: B,
    close: C,
) -> Result<T, AppError>
where
    B: Future<Output = Result<T, AppError>>,
    C: Future<Output = ()>,
{
    let result = match tokio::time::timeout_at(deadline, body).await {
        Ok(inner) => inner,
        Err(_) => Err(AppError::Timeout(timeout_secs)),
    };
    close.await;
    result
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.render(url).await
    }
}
