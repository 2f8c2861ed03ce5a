pub mod areas;
pub mod browser;
pub mod chromium;
pub mod description;
pub mod filters;
pub mod parser;
pub mod query;
pub mod search;
pub mod traits;
pub mod types;

pub use areas::AreaCodeMap;
pub use browser::HeadlessChromeSurface;
pub use chromium::ChromiumoxideSurface;
pub use filters::{FilterChain, FilterRule, Rejection, RuleSet};
pub use query::SearchQuery;
pub use search::Search;
pub use traits::{BrowserSurface, ReadyCondition};
pub use types::{Backend, BrowserOptions, DelayRange, Pacing};

use anyhow::Context;

/// Start a browser session on the configured backend.
pub async fn launch(options: &BrowserOptions) -> anyhow::Result<Box<dyn BrowserSurface>> {
    match options.backend {
        Backend::HeadlessChrome => {
            let options = options.clone();
            let surface = tokio::task::spawn_blocking(move || HeadlessChromeSurface::launch(&options))
                .await
                .context("Chrome launch task failed")??;
            Ok(Box::new(surface))
        }
        Backend::Chromiumoxide => {
            let surface = ChromiumoxideSurface::launch(options)
                .await
                .context("Failed to launch Chromium")?;
            Ok(Box::new(surface))
        }
    }
}
