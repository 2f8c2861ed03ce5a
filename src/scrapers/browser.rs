use crate::error::{Result, ScoutError};
use crate::scrapers::traits::{BrowserSurface, ReadyCondition};
use crate::scrapers::types::BrowserOptions;
use anyhow::Context;
use async_trait::async_trait;
use headless_chrome::browser::tab::point::Point;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long Chrome may sit without CDP traffic before headless_chrome drops
/// the connection. Challenge waits can be long and silent.
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

struct Session {
    // Dropping the browser kills the Chrome process.
    _browser: Browser,
    tab: Arc<Tab>,
}

/// Browser surface backed by headless_chrome.
///
/// headless_chrome is a blocking library, so every call runs on tokio's
/// blocking pool against a shared handle to the single tab.
pub struct HeadlessChromeSurface {
    session: Mutex<Option<Session>>,
}

impl HeadlessChromeSurface {
    /// Launch Chrome and open the one tab this session will use.
    pub fn launch(options: &BrowserOptions) -> anyhow::Result<Self> {
        info!("Launching Chrome (headless={})...", options.headless);

        let args: Vec<&OsStr> = options.extra_args.iter().map(OsStr::new).collect();
        let launch_options = LaunchOptions::default_builder()
            .headless(options.headless)
            .window_size(Some((options.window_width, options.window_height)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(args)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(launch_options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open browser tab")?;

        if let Some(user_agent) = &options.user_agent {
            tab.set_user_agent(user_agent, Some("en-US,en;q=0.9"), None)
                .context("Failed to set user agent")?;
        }

        Ok(Self {
            session: Mutex::new(Some(Session {
                _browser: browser,
                tab,
            })),
        })
    }

    fn tab(&self) -> Result<Arc<Tab>> {
        let guard = self
            .session
            .lock()
            .map_err(|_| ScoutError::Browser("session lock poisoned".to_string()))?;
        guard
            .as_ref()
            .map(|s| Arc::clone(&s.tab))
            .ok_or_else(|| ScoutError::Browser("browser session already closed".to_string()))
    }

    async fn on_tab<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Arc<Tab>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = self.tab()?;
        tokio::task::spawn_blocking(move || f(tab))
            .await
            .map_err(|e| ScoutError::Browser(format!("browser task failed: {}", e)))?
    }
}

#[async_trait]
impl BrowserSurface for HeadlessChromeSurface {
    async fn navigate(&self, url: &str, ready: ReadyCondition, timeout: Duration) -> Result<()> {
        debug!("Navigating to {} (waiting for {:?})", url, ready);
        let url = url.to_string();
        self.on_tab(move |tab| {
            // headless_chrome only exposes "frame stopped loading", which
            // covers both ready conditions.
            tab.set_default_timeout(timeout);
            tab.navigate_to(&url)
                .and_then(|t| t.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| ScoutError::Navigation(format!("{}: {}", url, e)))
        })
        .await
    }

    async fn rendered_content(&self) -> Result<String> {
        self.on_tab(|tab| {
            tab.get_content()
                .map_err(|e| ScoutError::Browser(format!("failed to read page content: {}", e)))
        })
        .await
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()> {
        let selector = selector.to_string();
        self.on_tab(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .map(|_| ())
                .map_err(|e| ScoutError::Timeout(format!("{}: {}", selector, e)))
        })
        .await
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        self.on_tab(move |tab| {
            tab.move_mouse_to_point(Point { x, y })
                .map(|_| ())
                .map_err(|e| ScoutError::Browser(format!("pointer move failed: {}", e)))
        })
        .await
    }

    async fn close(&self) {
        let session = match self.session.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(session) = session else {
            return;
        };

        info!("Closing Chrome...");
        let result = tokio::task::spawn_blocking(move || {
            if let Err(e) = session.tab.close(true) {
                warn!("Failed to close tab cleanly: {}", e);
            }
            drop(session);
        })
        .await;
        if let Err(e) = result {
            warn!("Browser teardown task failed: {}", e);
        }
    }

    fn backend_name(&self) -> &'static str {
        "headless_chrome"
    }
}
