use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A randomized delay, uniformly drawn from `[min_ms, max_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Draw one delay. A reversed range collapses to its lower bound.
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms.min(self.max_ms));
        }
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

/// Human-pacing and timeout settings for one run.
///
/// The randomized delays are part of the evasion strategy: evenly spaced
/// fetches are what gets a session challenged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// After each search page navigation, before looking at content
    pub after_navigation: DelayRange,
    /// After a challenge clears (or the wait gives up)
    pub after_challenge: DelayRange,
    /// After the pointer nudge, before reading cards
    pub after_pointer: DelayRange,
    /// Between successive search pages
    pub between_pages: DelayRange,
    /// Before each listing detail page fetch
    pub before_detail: DelayRange,
    /// Pointer target bounds, inclusive
    pub pointer_x: (u32, u32),
    pub pointer_y: (u32, u32),
    pub challenge_poll_ms: u64,
    pub challenge_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    pub listing_wait_secs: u64,
    pub detail_timeout_secs: u64,
    pub detail_wait_secs: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            after_navigation: DelayRange::new(2_000, 4_000),
            after_challenge: DelayRange::new(2_000, 4_000),
            after_pointer: DelayRange::new(500, 1_500),
            between_pages: DelayRange::new(3_000, 6_000),
            before_detail: DelayRange::new(1_500, 3_000),
            pointer_x: (100, 500),
            pointer_y: (100, 400),
            challenge_poll_ms: 1_000,
            challenge_timeout_secs: 60,
            navigation_timeout_secs: 60,
            listing_wait_secs: 15,
            detail_timeout_secs: 30,
            detail_wait_secs: 10,
        }
    }
}

impl Pacing {
    /// No delays and minimal timeouts, for driving scripted surfaces.
    pub fn immediate() -> Self {
        Self {
            after_navigation: DelayRange::zero(),
            after_challenge: DelayRange::zero(),
            after_pointer: DelayRange::zero(),
            between_pages: DelayRange::zero(),
            before_detail: DelayRange::zero(),
            challenge_poll_ms: 1,
            challenge_timeout_secs: 1,
            navigation_timeout_secs: 1,
            listing_wait_secs: 1,
            detail_timeout_secs: 1,
            detail_wait_secs: 1,
            ..Self::default()
        }
    }

    /// A pseudo-random on-screen coordinate for the pointer nudge.
    pub fn pointer_target(&self) -> (f64, f64) {
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(self.pointer_x.0..=self.pointer_x.1.max(self.pointer_x.0));
        let y = rng.gen_range(self.pointer_y.0..=self.pointer_y.1.max(self.pointer_y.0));
        (x as f64, y as f64)
    }

    pub fn challenge_poll(&self) -> Duration {
        Duration::from_millis(self.challenge_poll_ms)
    }

    /// How many polls fit into the challenge timeout.
    pub fn challenge_polls(&self) -> u64 {
        let poll = self.challenge_poll_ms.max(1);
        (self.challenge_timeout_secs * 1_000).div_ceil(poll)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn listing_wait(&self) -> Duration {
        Duration::from_secs(self.listing_wait_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }

    pub fn detail_wait(&self) -> Duration {
        Duration::from_secs(self.detail_wait_secs)
    }
}

/// Which browser automation library drives the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    #[default]
    HeadlessChrome,
    Chromiumoxide,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "headless-chrome" | "headless_chrome" | "chrome" => Ok(Backend::HeadlessChrome),
            "chromiumoxide" | "cdp" => Ok(Backend::Chromiumoxide),
            other => Err(format!("unknown browser backend '{}'", other)),
        }
    }
}

/// Launch settings shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub backend: Backend,
    /// Visible by default so an operator can clear a challenge by hand
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
    pub extra_args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            headless: false,
            window_width: 1440,
            window_height: 900,
            user_agent: None,
            extra_args: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--no-sandbox".to_string(),
                "--start-maximized".to_string(),
            ],
        }
    }
}
