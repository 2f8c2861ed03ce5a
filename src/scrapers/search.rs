use crate::error::ScoutError;
use crate::models::{Listing, PageResult, RunResult, SearchCriteria, Termination};
use crate::scrapers::description::DescriptionCache;
use crate::scrapers::filters::{FilterChain, RuleSet};
use crate::scrapers::parser::{parse_cards, CARD_SELECTOR};
use crate::scrapers::query::SearchQuery;
use crate::scrapers::traits::{BrowserSurface, ReadyCondition};
use crate::scrapers::types::{DelayRange, Pacing};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Phrases that only appear on the bot-detection interstitial.
pub const CHALLENGE_MARKERS: &[&str] = &["Press & Hold", "Press &amp; Hold", "confirm you are"];

pub fn is_challenge(content: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|m| content.contains(m))
}

/// Drives the browser through result pages until nothing new turns up.
///
/// One `Search` is one run: it owns the in-run seen-id set and the
/// description cache, and is consumed by [`Search::run`].
pub struct Search<'a> {
    surface: &'a dyn BrowserSurface,
    query: &'a SearchQuery,
    criteria: &'a SearchCriteria,
    rules: &'a RuleSet,
    existing_ids: &'a HashSet<String>,
    pacing: &'a Pacing,
    cancel: CancellationToken,
}

/// Outcome of fetching one page: either parsed cards or a reason to stop.
enum Fetched {
    Page(PageResult),
    Stop(Termination),
}

impl<'a> Search<'a> {
    pub fn new(
        surface: &'a dyn BrowserSurface,
        query: &'a SearchQuery,
        criteria: &'a SearchCriteria,
        rules: &'a RuleSet,
        existing_ids: &'a HashSet<String>,
        pacing: &'a Pacing,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            surface,
            query,
            criteria,
            rules,
            existing_ids,
            pacing,
            cancel,
        }
    }

    /// Paginate until a page adds no new accepted listings, the site shows
    /// no cards, navigation fails, or the run is cancelled.
    ///
    /// Always returns whatever was accumulated; the termination reason is
    /// for diagnostics only.
    pub async fn run(self) -> RunResult {
        info!("Base URL: {}", self.query.url());
        for (key, value) in self.query.segments() {
            debug!("  {}: {}", key, value);
        }

        let chain = FilterChain::new(self.criteria, self.rules, self.existing_ids);
        let mut descriptions = DescriptionCache::new(self.surface, self.pacing, self.cancel.clone());
        let mut seen: HashSet<String> = HashSet::new();
        let mut accepted: Vec<Listing> = Vec::new();
        let mut page_num: u32 = 1;
        let mut pages_fetched = 0;
        let mut challenges = 0;

        let termination = loop {
            if self.cancel.is_cancelled() {
                break Termination::Cancelled;
            }

            let page = match self.fetch_page(page_num).await {
                Fetched::Page(page) => page,
                Fetched::Stop(reason) => break reason,
            };
            pages_fetched += 1;
            if page.challenged {
                challenges += 1;
            }

            let mut new_on_page = 0;
            let mut interrupted = false;
            for listing in page.listings {
                if listing.listing_id.is_empty() {
                    debug!("Skipping card without a listing id: {:?}", listing.url);
                    continue;
                }
                if !seen.insert(listing.listing_id.clone()) {
                    continue;
                }
                if self.cancel.is_cancelled() {
                    interrupted = true;
                    break;
                }
                let verdict = chain.evaluate(&listing, &mut descriptions).await;
                // A description fetch cut short by cancellation proves nothing.
                if self.cancel.is_cancelled() {
                    interrupted = true;
                    break;
                }
                match verdict {
                    Ok(()) => {
                        debug!("Accepted {} ({})", listing.address, listing.listing_id);
                        accepted.push(listing);
                        new_on_page += 1;
                    }
                    Err(rejection) => {
                        debug!("FILTERED: {} - {}", listing.address, rejection);
                    }
                }
            }

            info!(
                "Found {} new listings on page {} ({} descriptions fetched so far)",
                new_on_page,
                page.page,
                descriptions.len()
            );
            if interrupted {
                break Termination::Cancelled;
            }
            if new_on_page == 0 {
                info!("No new unique listings on page {}, stopping pagination", page.page);
                break Termination::Exhausted;
            }

            if !self.pause(self.pacing.between_pages).await {
                break Termination::Cancelled;
            }
            page_num += 1;
        };

        match &termination {
            Termination::Aborted(reason) => warn!("Run aborted on page {}: {}", page_num, reason),
            Termination::Cancelled => warn!("Run cancelled on page {}", page_num),
            _ => {}
        }
        info!(
            "Total: {} listings across {} page(s)",
            accepted.len(),
            pages_fetched
        );

        RunResult {
            listings: accepted,
            pages_fetched,
            challenges,
            termination,
        }
    }

    async fn fetch_page(&self, page_num: u32) -> Fetched {
        let url = self.query.page_url(page_num);
        info!("--- Page {} ---", page_num);
        debug!("URL: {}", url);

        if let Err(e) = self
            .surface
            .navigate(&url, ReadyCondition::DomContentLoaded, self.pacing.navigation_timeout())
            .await
        {
            return Fetched::Stop(e.into());
        }

        if !self.pause(self.pacing.after_navigation).await {
            return Fetched::Stop(Termination::Cancelled);
        }

        let content = match self.surface.rendered_content().await {
            Ok(content) => content,
            Err(e) => return Fetched::Stop(e.into()),
        };

        let challenged = is_challenge(&content);
        if challenged {
            if let Some(stop) = self.wait_out_challenge().await {
                return Fetched::Stop(stop);
            }
        }

        let (x, y) = self.pacing.pointer_target();
        if let Err(e) = self.surface.move_pointer(x, y).await {
            debug!("Pointer move failed: {}", e);
        }
        if !self.pause(self.pacing.after_pointer).await {
            return Fetched::Stop(Termination::Cancelled);
        }

        match self
            .surface
            .wait_for_element(CARD_SELECTOR, self.pacing.listing_wait())
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                info!("No listings found on page {}, stopping pagination", page_num);
                return Fetched::Stop(Termination::NoListings);
            }
            Err(e) => return Fetched::Stop(e.into()),
        }

        match self.surface.rendered_content().await {
            Ok(html) => Fetched::Page(PageResult {
                page: page_num,
                listings: parse_cards(&html),
                challenged,
            }),
            Err(e) => Fetched::Stop(e.into()),
        }
    }

    /// Poll until the challenge markers disappear or the wait runs out.
    ///
    /// An operator may be solving the challenge in the visible window. After
    /// the timeout the page is used as-is. Returns a termination only if the
    /// run was cancelled or the session broke while waiting.
    async fn wait_out_challenge(&self) -> Option<Termination> {
        warn!("Bot detection triggered, waiting for the challenge to clear");

        let mut cleared = false;
        for _ in 0..self.pacing.challenge_polls() {
            if !self.sleep(self.pacing.challenge_poll()).await {
                return Some(Termination::Cancelled);
            }
            match self.surface.rendered_content().await {
                Ok(content) if !is_challenge(&content) => {
                    cleared = true;
                    break;
                }
                Ok(_) => {}
                Err(e) => return Some(e.into()),
            }
        }

        if cleared {
            info!("Challenge cleared");
        } else {
            warn!(
                "Challenge still present after {}s, continuing anyway",
                self.pacing.challenge_timeout_secs
            );
        }

        if !self.pause(self.pacing.after_challenge).await {
            return Some(Termination::Cancelled);
        }
        None
    }

    async fn pause(&self, range: DelayRange) -> bool {
        self.sleep(range.sample()).await
    }

    /// Sleep unless cancelled first. Returns false on cancellation.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

impl From<ScoutError> for Termination {
    fn from(err: ScoutError) -> Self {
        Termination::Aborted(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_markers() {
        assert!(is_challenge("<p>Press &amp; Hold to confirm</p>"));
        assert!(is_challenge("Please confirm you are a human"));
        assert!(!is_challenge("<div data-testid=\"listing-card\"></div>"));
    }
}
