use crate::models::{RunResult, SearchCriteria};
use crate::scrapers::areas::AreaCodeMap;
use crate::scrapers::filters::RuleSet;
use crate::scrapers::query::SearchQuery;
use crate::scrapers::search::Search;
use crate::scrapers::traits::BrowserSurface;
use crate::scrapers::types::Pacing;
use crate::store::DedupOracle;
use anyhow::{Context, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything one run needs, fixed before the first page is fetched.
pub struct RunPlan<'a> {
    pub criteria: &'a SearchCriteria,
    pub rules: &'a RuleSet,
    pub areas: &'a AreaCodeMap,
    pub pacing: &'a Pacing,
}

/// Execute one complete run against `surface`, then close it.
///
/// Configuration errors (an unknown area) and a failing dedup oracle are
/// returned before any navigation. The surface is closed on every path out
/// of this function, including those errors.
pub async fn run_monitor(
    surface: &dyn BrowserSurface,
    plan: RunPlan<'_>,
    oracle: &dyn DedupOracle,
    cancel: CancellationToken,
) -> Result<RunResult> {
    let result = run_search(surface, &plan, oracle, cancel).await;
    surface.close().await;
    result
}

async fn run_search(
    surface: &dyn BrowserSurface,
    plan: &RunPlan<'_>,
    oracle: &dyn DedupOracle,
    cancel: CancellationToken,
) -> Result<RunResult> {
    let price_window = plan.rules.price_window(plan.criteria);
    let query = SearchQuery::build(plan.criteria, price_window, plan.areas)
        .context("Failed to build search query")?;
    let existing_ids = oracle
        .existing_ids()
        .context("Failed to load already-recorded listing ids")?;

    info!(
        "Running {} search: price {}-{}, {} area(s), {} known listings",
        surface.backend_name(),
        price_window.0,
        price_window.1,
        plan.criteria.areas.len(),
        existing_ids.len()
    );

    let search = Search::new(
        surface,
        &query,
        plan.criteria,
        plan.rules,
        &existing_ids,
        plan.pacing,
        cancel,
    );
    Ok(search.run().await)
}

/// Turn interrupt signals into cancellation.
///
/// The first signal cancels `cancel` so the run winds down at its next
/// checkpoint. Returns true when a second signal arrives, meaning the caller
/// should exit without waiting; false if the signal source fails.
pub async fn forward_interrupts<F, Fut>(mut next_signal: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        warn!("Cannot listen for interrupts: {}", e);
        return false;
    }
    warn!("Interrupted, finishing the current step and shutting down (interrupt again to quit now)...");
    cancel.cancel();

    match next_signal().await {
        Ok(()) => {
            warn!("Interrupted again, quitting immediately");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    type Signal = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

    /// One signal per `notify_one`.
    fn signals(notify: &Arc<Notify>) -> impl FnMut() -> Signal {
        let notify = notify.clone();
        move || {
            let notify = notify.clone();
            let signal: Signal = Box::pin(async move {
                notify.notified().await;
                Ok(())
            });
            signal
        }
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_second_forces_exit() {
        let notify = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(forward_interrupts(signals(&notify), cancel.clone()));

        notify.notify_one();
        tokio::time::timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .unwrap();
        assert!(!task.is_finished());

        notify.notify_one();
        let force = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(force);
    }

    #[tokio::test]
    async fn test_failing_signal_source_does_not_cancel() {
        let cancel = CancellationToken::new();
        let force = forward_interrupts(
            || async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no handler")) },
            cancel.clone(),
        )
        .await;
        assert!(!force);
        assert!(!cancel.is_cancelled());
    }
}
