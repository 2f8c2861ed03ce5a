#![allow(dead_code)]

use async_trait::async_trait;
use rental_scout::scrapers::{BrowserSurface, ReadyCondition};
use rental_scout::{Result, ScoutError};
use scraper::{Html, Selector};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Successive renders of one URL. The last snapshot repeats forever.
struct Script {
    snapshots: VecDeque<String>,
}

impl Script {
    fn current(&self) -> String {
        self.snapshots.front().cloned().unwrap_or_default()
    }

    fn read(&mut self) -> String {
        if self.snapshots.len() > 1 {
            self.snapshots.pop_front().unwrap_or_default()
        } else {
            self.current()
        }
    }
}

#[derive(Default)]
struct State {
    scripts: HashMap<String, Script>,
    current: Option<String>,
    navigations: Vec<String>,
    pointer_moves: usize,
    closes: usize,
}

/// In-memory browser that serves canned HTML per URL.
///
/// Unknown URLs fail navigation, like an unreachable page would.
#[derive(Default)]
pub struct ScriptedSurface {
    state: Mutex<State>,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.page_sequence(url, vec![html.into()])
    }

    /// Each `rendered_content` call returns the next snapshot.
    pub fn page_sequence(self, url: impl Into<String>, snapshots: Vec<String>) -> Self {
        self.state.lock().unwrap().scripts.insert(
            url.into(),
            Script {
                snapshots: snapshots.into(),
            },
        );
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn pointer_moves(&self) -> usize {
        self.state.lock().unwrap().pointer_moves
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

#[async_trait]
impl BrowserSurface for ScriptedSurface {
    async fn navigate(&self, url: &str, _ready: ReadyCondition, _timeout: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        if state.scripts.contains_key(url) {
            state.current = Some(url.to_string());
            Ok(())
        } else {
            state.current = None;
            Err(ScoutError::Navigation(format!("{}: net::ERR_NAME_NOT_RESOLVED", url)))
        }
    }

    async fn rendered_content(&self) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let url = state
            .current
            .clone()
            .ok_or_else(|| ScoutError::Browser("no page loaded".to_string()))?;
        Ok(state
            .scripts
            .get_mut(&url)
            .map(Script::read)
            .unwrap_or_default())
    }

    async fn wait_for_element(&self, selector: &str, _timeout: Duration) -> Result<()> {
        let html = {
            let state = self.state.lock().unwrap();
            state
                .current
                .as_ref()
                .and_then(|url| state.scripts.get(url))
                .map(Script::current)
                .unwrap_or_default()
        };
        let sel = Selector::parse(selector).map_err(|e| ScoutError::Browser(e.to_string()))?;
        if Html::parse_document(&html).select(&sel).next().is_some() {
            Ok(())
        } else {
            Err(ScoutError::Timeout(selector.to_string()))
        }
    }

    async fn move_pointer(&self, _x: f64, _y: f64) -> Result<()> {
        self.state.lock().unwrap().pointer_moves += 1;
        Ok(())
    }

    async fn close(&self) {
        self.state.lock().unwrap().closes += 1;
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

/// Wraps a [`ScriptedSurface`] and cancels the run when `trigger` is
/// navigated, as if the operator pressed Ctrl-C during that load.
pub struct CancelOnNavigate {
    inner: ScriptedSurface,
    trigger: String,
    cancel: CancellationToken,
    stall: bool,
}

impl CancelOnNavigate {
    pub fn new(inner: ScriptedSurface, trigger: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            inner,
            trigger: trigger.into(),
            cancel,
            stall: false,
        }
    }

    /// Never finish loading the trigger URL.
    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.inner.navigations()
    }
}

#[async_trait]
impl BrowserSurface for CancelOnNavigate {
    async fn navigate(&self, url: &str, ready: ReadyCondition, timeout: Duration) -> Result<()> {
        if url == self.trigger {
            self.cancel.cancel();
            if self.stall {
                self.inner.state.lock().unwrap().navigations.push(url.to_string());
                std::future::pending::<()>().await;
            }
        }
        self.inner.navigate(url, ready, timeout).await
    }

    async fn rendered_content(&self) -> Result<String> {
        self.inner.rendered_content().await
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.inner.wait_for_element(selector, timeout).await
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()> {
        self.inner.move_pointer(x, y).await
    }

    async fn close(&self) {
        self.inner.close().await
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn listing_url(id: &str) -> String {
    format!("https://streeteasy.com/building/test-building-{}/{}", id, id)
}

/// One search result card in the site's markup.
pub fn card(id: &str, address: &str, neighborhood: &str, price: u32) -> String {
    format!(
        r#"<div data-testid="listing-card">
             <a href="{url}">{address}</a>
             <div class="PriceInfo-module__priceInfo___abc12">${price}base rent</div>
             <p class="ListingDescription-module__title___xyz">Rental unit in {neighborhood}</p>
           </div>"#,
        url = listing_url(id),
        address = address,
        price = format_price(price),
        neighborhood = neighborhood,
    )
}

fn format_price(price: u32) -> String {
    let digits = price.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn results_page(cards: &[String]) -> String {
    format!("<html><body><main>{}</main></body></html>", cards.join("\n"))
}

pub fn empty_results_page() -> String {
    "<html><body><p>No results match your search.</p></body></html>".to_string()
}

pub fn challenge_page() -> String {
    "<html><body><h1>Press &amp; Hold</h1><p>Please confirm you are a human.</p></body></html>"
        .to_string()
}

pub fn detail_page(description: &str) -> String {
    format!(
        r#"<html><body><section data-testid="listing-details-description"><p>{}</p></section></body></html>"#,
        description
    )
}
