use std::path::PathBuf;
use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, TimeSinceEpoch};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rollcall_core::error::AppError;
use rollcall_core::models::{ScrapedProfile, SessionCookie};
use rollcall_core::pagination::PaginationControl;
use rollcall_core::traits::{PageSource, Target};
use tokio::task::JoinHandle;
use url::Url;

use crate::listing::ListingParser;
use crate::selectors::CompiledSelectors;

/// Launch options for [`BrowserPageSource`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run without a window. Interactive login needs a visible window.
    pub headless: bool,
    /// Explicit Chrome/Chromium binary; looked up when `None`.
    pub chrome_binary: Option<PathBuf>,
    /// Upper bound on a single navigation.
    pub page_load_timeout: Duration,
    /// Interval between DOM checks while waiting for an element.
    pub poll_interval: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_binary: None,
            page_load_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// A single Chromium tab driven over the Chrome DevTools Protocol.
///
/// All harvest traffic goes through one tab so the signed-in session and
/// its cookies are shared by every navigation.
///
/// # Example
///
/// ```rust,no_run
/// use rollcall_client::{BrowserOptions, BrowserPageSource, SiteSelectors};
/// use rollcall_core::traits::PageSource;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let selectors = SiteSelectors::default().compile()?;
/// let source = BrowserPageSource::launch(BrowserOptions::default(), selectors).await?;
/// source.navigate("https://www.linkedin.com/").await?;
/// println!("{}", source.current_url().await?);
/// source.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct BrowserPageSource {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    parser: ListingParser,
    options: BrowserOptions,
}

impl BrowserPageSource {
    /// Launch Chromium and open the tab.
    pub async fn launch(
        options: BrowserOptions,
        selectors: CompiledSelectors,
    ) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .window_size(1366, 900);

        if let Some(bin) = options.chrome_binary.clone().or_else(find_chrome_binary) {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        if options.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let config = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::Browser(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::Browser(format!("Failed to open tab: {e}")))?;

        tracing::info!(headless = options.headless, "Browser started");
        Ok(Self {
            browser,
            page,
            handler,
            parser: ListingParser::new(selectors),
            options,
        })
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<(), AppError> {
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler.abort();
        closed
            .map(|_| ())
            .map_err(|e| AppError::Browser(format!("Failed to close browser: {e}")))
    }

    fn ensure_alive(&self) -> Result<(), AppError> {
        if self.handler.is_finished() {
            return Err(AppError::Browser("browser connection lost".into()));
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<String, AppError> {
        self.ensure_alive()?;
        self.page
            .content()
            .await
            .map_err(|e| AppError::Navigation(format!("Failed to read page content: {e}")))
    }
}

impl PageSource for BrowserPageSource {
    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        self.ensure_alive()?;
        let timeout = self.options.page_load_timeout;
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                self.ensure_alive()?;
                Err(AppError::Navigation(format!("Failed to navigate to {url}: {e}")))
            }
            Err(_) => Err(AppError::Timeout(timeout.as_secs())),
        }
    }

    async fn current_url(&self) -> Result<String, AppError> {
        self.ensure_alive()?;
        let url = self
            .page
            .url()
            .await
            .map_err(|e| AppError::Navigation(format!("Failed to read current URL: {e}")))?;
        Ok(url.unwrap_or_default())
    }

    async fn wait_for(&self, target: Target, timeout: Duration) -> Result<bool, AppError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.snapshot().await {
                Ok(html) if self.parser.is_present(&html, target) => return Ok(true),
                Ok(_) => {}
                Err(e @ AppError::Browser(_)) => return Err(e),
                Err(e) => tracing::debug!(?target, error = %e, "Snapshot failed while waiting"),
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    async fn pagination_controls(&self) -> Result<Vec<PaginationControl>, AppError> {
        let html = self.snapshot().await?;
        Ok(self.parser.pagination_controls(&html))
    }

    async fn links(&self, target: Target) -> Result<Vec<String>, AppError> {
        let html = self.snapshot().await?;
        Ok(self.parser.links(&html, target))
    }

    async fn profile_entries(&self) -> Result<Vec<ScrapedProfile>, AppError> {
        let current = self.current_url().await?;
        let base = Url::parse(&current).map_err(|e| {
            AppError::Navigation(format!("Unparseable page address '{current}': {e}"))
        })?;
        let html = self.snapshot().await?;
        Ok(self.parser.profile_entries(&html, &base))
    }

    async fn text_of(&self, target: Target) -> Result<Option<String>, AppError> {
        let html = self.snapshot().await?;
        Ok(self.parser.text_of(&html, target))
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, AppError> {
        self.ensure_alive()?;
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| AppError::Browser(format!("Failed to read cookies: {e}")))?;
        Ok(cookies.into_iter().map(from_cdp).collect())
    }

    async fn set_cookies(&self, cookies: Vec<SessionCookie>) -> Result<(), AppError> {
        self.ensure_alive()?;
        let params = cookies
            .into_iter()
            .map(to_cdp)
            .collect::<Result<Vec<_>, _>>()?;
        self.page
            .set_cookies(params)
            .await
            .map_err(|e| AppError::Browser(format!("Failed to set cookies: {e}")))?;
        Ok(())
    }
}

fn from_cdp(cookie: Cookie) -> SessionCookie {
    SessionCookie {
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: Some(cookie.path),
        expires: (!cookie.session).then_some(cookie.expires),
        secure: Some(cookie.secure),
        http_only: Some(cookie.http_only),
    }
}

fn to_cdp(cookie: SessionCookie) -> Result<CookieParam, AppError> {
    let mut builder = CookieParam::builder()
        .name(cookie.name)
        .value(cookie.value)
        .domain(cookie.domain)
        .path(cookie.path.unwrap_or_else(|| "/".to_string()));
    if let Some(expires) = cookie.expires.filter(|e| *e > 0.0) {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    if let Some(secure) = cookie.secure {
        builder = builder.secure(secure);
    }
    if let Some(http_only) = cookie.http_only {
        builder = builder.http_only(http_only);
    }
    builder
        .build()
        .map_err(|e| AppError::Session(format!("Invalid cookie: {e}")))
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// On systems where Chromium is installed via **snap**, the wrapper at
/// `/snap/bin/chromium` strips unknown CLI flags. The real binary inside the
/// snap is tried first, then well-known system paths. `None` lets
/// `chromiumoxide` do its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}
