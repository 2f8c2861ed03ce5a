use crate::error::Result;
use crate::scrapers::parser::{parse_description, DESCRIPTION_SELECTOR};
use crate::scrapers::traits::{BrowserSurface, ReadyCondition};
use crate::scrapers::types::Pacing;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Listing detail descriptions fetched during one run, keyed by URL.
///
/// Owned by a single run and dropped with it. Failed fetches are cached as
/// empty so a broken page is only tried once. A fetch interrupted by
/// cancellation is not cached.
pub struct DescriptionCache<'a> {
    surface: &'a dyn BrowserSurface,
    pacing: &'a Pacing,
    cancel: CancellationToken,
    cache: HashMap<String, String>,
}

impl<'a> DescriptionCache<'a> {
    pub fn new(surface: &'a dyn BrowserSurface, pacing: &'a Pacing, cancel: CancellationToken) -> Self {
        Self {
            surface,
            pacing,
            cancel,
            cache: HashMap::new(),
        }
    }

    /// Description text for `url`, or empty if it cannot be fetched.
    pub async fn get(&mut self, url: &str) -> String {
        if url.is_empty() {
            return String::new();
        }
        if let Some(cached) = self.cache.get(url) {
            return cached.clone();
        }

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            fetched = self.fetch(url) => Some(fetched),
        };
        let description = match fetched {
            None => {
                debug!("Description fetch for {} cancelled", url);
                return String::new();
            }
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                warn!("No description for {}: {}", url, e);
                String::new()
            }
        };
        self.cache.insert(url.to_string(), description.clone());
        description
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        tokio::time::sleep(self.pacing.before_detail.sample()).await;
        self.surface
            .navigate(url, ReadyCondition::DomContentLoaded, self.pacing.detail_timeout())
            .await?;
        self.surface
            .wait_for_element(DESCRIPTION_SELECTOR, self.pacing.detail_wait())
            .await?;
        let html = self.surface.rendered_content().await?;
        let description = parse_description(&html);
        debug!("Fetched {} chars of description from {}", description.len(), url);
        Ok(description)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
