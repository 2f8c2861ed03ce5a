use crate::error::{Result, ScoutError};
use crate::scrapers::traits::{BrowserSurface, ReadyCondition};
use crate::scrapers::types::BrowserOptions;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::layout::Point;
use chromiumoxide::Page;
use futures_util::stream::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const ELEMENT_POLL: Duration = Duration::from_millis(250);

struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// Browser surface backed by chromiumoxide's async CDP client.
pub struct ChromiumoxideSurface {
    page: Page,
    session: Mutex<Option<Session>>,
}

impl ChromiumoxideSurface {
    /// Launch Chromium and open the one page this session will use.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        info!("Launching Chromium via CDP (headless={})...", options.headless);

        let mut builder = BrowserConfig::builder()
            .window_size(options.window_width, options.window_height)
            .args(options.extra_args.iter().map(String::as_str));
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(ScoutError::Browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScoutError::Browser(e.to_string()))?;

        // The handler must be polled for the connection to make progress.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScoutError::Browser(e.to_string()))?;

        if let Some(user_agent) = &options.user_agent {
            page.set_user_agent(SetUserAgentOverrideParams::new(user_agent.clone()))
                .await
                .map_err(|e| ScoutError::Browser(e.to_string()))?;
        }

        Ok(Self {
            page,
            session: Mutex::new(Some(Session { browser, handler })),
        })
    }
}

#[async_trait]
impl BrowserSurface for ChromiumoxideSurface {
    async fn navigate(&self, url: &str, ready: ReadyCondition, timeout: Duration) -> Result<()> {
        debug!("Navigating to {} (waiting for {:?})", url, ready);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScoutError::Navigation(format!("{}: {}", url, e))),
            Err(_) => Err(ScoutError::Navigation(format!(
                "{}: no response within {:?}",
                url, timeout
            ))),
        }
    }

    async fn rendered_content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| ScoutError::Browser(format!("failed to read page content: {}", e)))
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScoutError::Timeout(format!(
                    "{} not found within {:?}",
                    selector, timeout
                )));
            }
            tokio::time::sleep(ELEMENT_POLL).await;
        }
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        self.page
            .move_mouse(Point::new(x, y))
            .await
            .map(|_| ())
            .map_err(|e| ScoutError::Browser(format!("pointer move failed: {}", e)))
    }

    async fn close(&self) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };

        info!("Closing Chromium...");
        if let Err(e) = session.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = session.browser.wait().await {
            warn!("Failed waiting for browser exit: {}", e);
        }
        session.handler.abort();
    }

    fn backend_name(&self) -> &'static str {
        "chromiumoxide"
    }
}
