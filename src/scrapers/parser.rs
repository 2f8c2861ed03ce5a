//! Listing card and detail page extraction.
//!
//! Every selector here matches on stable fragments of attribute values
//! (`[class*=...]`, `[href*=...]`) rather than exact class names, because the
//! site's generated CSS-module classes change between deploys. This is the
//! most fragile part of the crate: when the site's markup changes, these
//! patterns are what need updating.

use crate::models::Listing;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// One search result card.
pub const CARD_SELECTOR: &str = r#"[data-testid="listing-card"]"#;

/// Anything that looks like the description block on a detail page.
pub const DESCRIPTION_SELECTOR: &str =
    r#"[data-testid="listing-details-description"], [class*="Description"]"#;

static CARD: Lazy<Selector> = Lazy::new(|| selector(CARD_SELECTOR));
static BUILDING_LINK: Lazy<Selector> =
    Lazy::new(|| selector(r#"a[href*="streeteasy.com/building"]"#));
static PRICE: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="PriceInfo"]"#));
static TITLE: Lazy<Selector> =
    Lazy::new(|| selector(r#"[class*="ListingDescription-module__title"]"#));
static STATUS: Lazy<Selector> = Lazy::new(|| selector(r#"[data-testid="listing-status"]"#));

/// Detail page description candidates, most specific first.
static DESCRIPTIONS: Lazy<[Selector; 3]> = Lazy::new(|| {
    [
        selector(r#"[data-testid="listing-details-description"]"#),
        selector(r#"[class*="Description"]"#),
        selector(".listing-description"),
    ]
});

static LISTING_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/building/[^/]+/([^?]+)").expect("valid listing id pattern"));
static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[\d,]+").expect("valid price pattern"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid CSS")
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parse every listing card on a rendered results page, top to bottom.
pub fn parse_cards(html: &str) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let listings: Vec<Listing> = document.select(&CARD).map(parse_card_element).collect();
    debug!("Found {} listing cards on page", listings.len());
    listings
}

/// Parse a single card from an HTML fragment.
pub fn parse_card(fragment: &str) -> Listing {
    let document = Html::parse_fragment(fragment);
    // The fragment may or may not include the card wrapper itself.
    let root = document
        .select(&CARD)
        .next()
        .unwrap_or_else(|| document.root_element());
    parse_card_element(root)
}

/// Missing sub-elements leave the matching field empty; nothing here fails.
fn parse_card_element(card: ElementRef<'_>) -> Listing {
    let link = card.select(&BUILDING_LINK).next();
    let url = link
        .and_then(|a| a.value().attr("href"))
        .unwrap_or_default()
        .to_string();
    let address = link.map(text_of).unwrap_or_default();

    let listing_id = extract_listing_id(&url).unwrap_or_default();

    let price = card
        .select(&PRICE)
        .next()
        .and_then(|el| parse_price(&el.text().collect::<String>()));

    let neighborhood = card
        .select(&TITLE)
        .next()
        .map(|el| neighborhood_from_title(&text_of(el)))
        .unwrap_or_default();

    let status = card.select(&STATUS).next().map(text_of).unwrap_or_default();

    Listing {
        listing_id,
        url,
        address,
        neighborhood,
        price,
        status,
    }
}

/// The path segment after `/building/<name>/`, without any query string.
pub fn extract_listing_id(url: &str) -> Option<String> {
    LISTING_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First dollar amount in `text`, e.g. `"$3,600base rent"` -> 3600.
pub fn parse_price(text: &str) -> Option<i64> {
    let token = DOLLAR_AMOUNT.find(text)?.as_str();
    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// `"Rental unit in Bushwick"` -> `"Bushwick"`. Empty if there is no `" in "`.
pub fn neighborhood_from_title(title: &str) -> String {
    title
        .rsplit_once(" in ")
        .map(|(_, hood)| hood.trim().to_string())
        .unwrap_or_default()
}

/// Visible description text from a listing detail page, or empty.
pub fn parse_description(html: &str) -> String {
    let document = Html::parse_document(html);
    DESCRIPTIONS
        .iter()
        .find_map(|sel| document.select(sel).next())
        .map(|el| {
            el.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}
