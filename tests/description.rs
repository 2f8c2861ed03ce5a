mod common;

use common::*;
use rental_scout::scrapers::description::DescriptionCache;
use rental_scout::scrapers::{DelayRange, Pacing};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_description_fetched_once_per_url() {
    let pacing = Pacing::immediate();
    let url = listing_url("1");
    let surface = ScriptedSurface::new().page(url.clone(), detail_page("Sunny corner studio."));

    let mut cache = DescriptionCache::new(&surface, &pacing, CancellationToken::new());
    assert!(cache.is_empty());

    assert_eq!(cache.get(&url).await, "Sunny corner studio.");
    assert_eq!(cache.get(&url).await, "Sunny corner studio.");
    assert_eq!(surface.navigations(), vec![url]);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_failed_fetch_cached_as_empty() {
    let pacing = Pacing::immediate();
    let url = listing_url("2");
    let surface = ScriptedSurface::new();

    let mut cache = DescriptionCache::new(&surface, &pacing, CancellationToken::new());
    assert_eq!(cache.get(&url).await, "");
    assert_eq!(cache.get(&url).await, "");
    assert_eq!(surface.navigations(), vec![url]);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_empty_url_never_navigates() {
    let pacing = Pacing::immediate();
    let surface = ScriptedSurface::new();

    let mut cache = DescriptionCache::new(&surface, &pacing, CancellationToken::new());
    assert_eq!(cache.get("").await, "");
    assert!(surface.navigations().is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_cancelled_fetch_is_abandoned_and_not_cached() {
    let pacing = Pacing::immediate();
    let url = listing_url("3");
    let cancel = CancellationToken::new();
    let surface = CancelOnNavigate::new(
        ScriptedSurface::new().page(url.clone(), detail_page("Never read.")),
        url.clone(),
        cancel.clone(),
    )
    .stalled();

    let mut cache = DescriptionCache::new(&surface, &pacing, cancel);
    let description = tokio::time::timeout(Duration::from_secs(5), cache.get(&url))
        .await
        .expect("cancellation should abandon the stalled load");

    assert_eq!(description, "");
    assert!(cache.is_empty());

    // Once cancelled, later lookups do not touch the browser.
    assert_eq!(cache.get(&listing_url("4")).await, "");
    assert_eq!(surface.navigations(), vec![url]);
}

#[tokio::test]
async fn test_pre_detail_delay_yields_to_cancellation() {
    let pacing = Pacing {
        before_detail: DelayRange::new(60_000, 60_000),
        ..Pacing::immediate()
    };
    let surface = ScriptedSurface::new().page(listing_url("5"), detail_page("Unused."));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let mut cache = DescriptionCache::new(&surface, &pacing, cancel);
    let description = tokio::time::timeout(Duration::from_secs(5), cache.get(&listing_url("5")))
        .await
        .expect("cancellation should cut the pre-detail delay short");

    assert_eq!(description, "");
    assert!(surface.navigations().is_empty());
}
