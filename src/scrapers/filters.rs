//! Client-side rules applied to every parsed listing.
//!
//! The site query cannot express everything (street numbers, description
//! keywords), and it sometimes leaks listings outside the requested window,
//! so criteria are checked again here.

use crate::models::{Listing, ListingField, SearchCriteria};
use crate::scrapers::description::DescriptionCache;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// `"123 East 45th Street"` -> 45. The directional prefix is optional.
///
/// The street token must follow whitespace, otherwise the `st` of an
/// ordinal ("1st Avenue") would read as "Street".
static STREET_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:East|West|E|W)?\s*(\d+)(?:st|nd|rd|th)?\s+(?:Street|St)\b")
        .expect("valid street pattern")
});

/// Substrings that disqualify a listing, per field. Matching is case-sensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockedSubstrings {
    pub url: Vec<String>,
    pub address: Vec<String>,
    pub neighborhood: Vec<String>,
}

impl Default for BlockedSubstrings {
    fn default() -> Self {
        Self {
            url: vec!["?featured=1".to_string(), "?infeed=1".to_string()],
            address: Vec::new(),
            neighborhood: vec!["New Development".to_string()],
        }
    }
}

impl BlockedSubstrings {
    fn for_field(&self, field: ListingField) -> &[String] {
        match field {
            ListingField::Url => &self.url,
            ListingField::Address => &self.address,
            ListingField::Neighborhood => &self.neighborhood,
        }
    }
}

/// Static rule tables, built once per run and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub blocked: BlockedSubstrings,
    /// Lowercase comparison against the detail page description
    pub description_keywords: Vec<String>,
    /// Used for whichever price bound the criteria leave unset
    pub default_min_price: u32,
    pub default_max_price: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            blocked: BlockedSubstrings::default(),
            description_keywords: DEFAULT_DESCRIPTION_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            default_min_price: 0,
            default_max_price: 2500,
        }
    }
}

/// Restricted-housing phrases that disqualify a listing.
pub const DEFAULT_DESCRIPTION_KEYWORDS: &[&str] = &[
    "senior housing",
    "income restricted",
    "income-restricted",
    "income requirement",
    "minimum income",
    "maximum income",
    "62 years or older",
    "55 and older",
    "age restricted",
    "age-restricted",
    "lottery",
    "affordable housing",
    "section 8",
    "hpd",
    "mitchell-lama",
    "hdfc",
];

impl RuleSet {
    /// The effective `(min, max)` price window for `criteria`.
    pub fn price_window(&self, criteria: &SearchCriteria) -> (u32, u32) {
        (
            criteria.min_price.unwrap_or(self.default_min_price),
            criteria.max_price.unwrap_or(self.default_max_price),
        )
    }
}

/// The rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterRule {
    AlreadyKnown,
    BlockedSubstring,
    Status,
    PriceWindow,
    Neighborhood,
    StreetNumber,
    DescriptionKeyword,
}

impl FilterRule {
    pub const ALL: [FilterRule; 7] = [
        FilterRule::AlreadyKnown,
        FilterRule::BlockedSubstring,
        FilterRule::Status,
        FilterRule::PriceWindow,
        FilterRule::Neighborhood,
        FilterRule::StreetNumber,
        FilterRule::DescriptionKeyword,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterRule::AlreadyKnown => "already-known",
            FilterRule::BlockedSubstring => "blocked-substring",
            FilterRule::Status => "status",
            FilterRule::PriceWindow => "price-window",
            FilterRule::Neighborhood => "neighborhood",
            FilterRule::StreetNumber => "street-number",
            FilterRule::DescriptionKeyword => "description-keyword",
        }
    }
}

/// Why a listing was not reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub rule: FilterRule,
    pub reason: String,
}

impl Rejection {
    fn new(rule: FilterRule, reason: impl Into<String>) -> Self {
        Self {
            rule,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule.name(), self.reason)
    }
}

/// First street number before a "Street"/"St" token, if any.
pub fn street_number(address: &str) -> Option<u32> {
    STREET_NUMBER
        .captures(address)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Loose two-way match between a site neighborhood label and configured
/// area names.
///
/// Known imprecision: a short area name that happens to be a substring of an
/// unrelated longer label (or the reverse) is accepted.
pub fn neighborhood_matches(neighborhood: &str, areas: &[String]) -> bool {
    let hood = neighborhood.to_lowercase();
    areas.iter().any(|area| {
        let area = area.to_lowercase();
        area.contains(&hood) || hood.contains(&area)
    })
}

/// The ordered predicate chain for one run.
pub struct FilterChain<'a> {
    criteria: &'a SearchCriteria,
    rules: &'a RuleSet,
    existing_ids: &'a HashSet<String>,
    price_window: (u32, u32),
}

impl<'a> FilterChain<'a> {
    pub fn new(
        criteria: &'a SearchCriteria,
        rules: &'a RuleSet,
        existing_ids: &'a HashSet<String>,
    ) -> Self {
        Self {
            criteria,
            rules,
            existing_ids,
            price_window: rules.price_window(criteria),
        }
    }

    /// Run every rule that needs no I/O, stopping at the first rejection.
    pub fn check_static(&self, listing: &Listing) -> Result<(), Rejection> {
        for rule in FilterRule::ALL {
            if rule != FilterRule::DescriptionKeyword {
                self.check_rule(rule, listing)?;
            }
        }
        Ok(())
    }

    fn check_rule(&self, rule: FilterRule, listing: &Listing) -> Result<(), Rejection> {
        match rule {
            FilterRule::AlreadyKnown => {
                if self.existing_ids.contains(&listing.listing_id) {
                    return Err(Rejection::new(rule, "already recorded"));
                }
            }
            FilterRule::BlockedSubstring => {
                for field in [
                    ListingField::Url,
                    ListingField::Address,
                    ListingField::Neighborhood,
                ] {
                    let value = field.value(listing);
                    if let Some(hit) = self
                        .rules
                        .blocked
                        .for_field(field)
                        .iter()
                        .find(|s| value.contains(s.as_str()))
                    {
                        return Err(Rejection::new(
                            rule,
                            format!("{} contains '{}'", field, hit),
                        ));
                    }
                }
            }
            FilterRule::Status => {
                let status = listing.status.trim().to_lowercase();
                if !status.is_empty() && status != "active" && status != "open" {
                    return Err(Rejection::new(rule, format!("status is '{}'", listing.status)));
                }
            }
            FilterRule::PriceWindow => {
                let (min, max) = self.price_window;
                if let Some(price) = listing.price {
                    if price < i64::from(min) || price > i64::from(max) {
                        return Err(Rejection::new(
                            rule,
                            format!("${} outside ${}-${}", price, min, max),
                        ));
                    }
                }
            }
            FilterRule::Neighborhood => {
                let areas = &self.criteria.areas;
                if !areas.is_empty() && !neighborhood_matches(&listing.neighborhood, areas) {
                    return Err(Rejection::new(
                        rule,
                        format!("'{}' not in configured areas", listing.neighborhood),
                    ));
                }
            }
            FilterRule::StreetNumber => {
                if let Some(max) = self.criteria.max_street_number {
                    if let Some(street) = street_number(&listing.address) {
                        debug!("Address '{}' -> street {}, max {}", listing.address, street, max);
                        if street > max {
                            return Err(Rejection::new(
                                rule,
                                format!("street {} > {}", street, max),
                            ));
                        }
                    }
                }
            }
            FilterRule::DescriptionKeyword => {}
        }
        Ok(())
    }

    /// Whether the description rule has anything to check.
    pub fn needs_description(&self) -> bool {
        !self.rules.description_keywords.is_empty()
    }

    /// Reject if the description contains any configured keyword.
    pub fn check_description(&self, description: &str) -> Result<(), Rejection> {
        let text = description.to_lowercase();
        match self
            .rules
            .description_keywords
            .iter()
            .find(|k| text.contains(&k.to_lowercase()))
        {
            Some(keyword) => Err(Rejection::new(
                FilterRule::DescriptionKeyword,
                format!("description mentions '{}'", keyword),
            )),
            None => Ok(()),
        }
    }

    /// Run the full chain. The description rule fetches the detail page
    /// through `descriptions` only if every cheaper rule passed.
    pub async fn evaluate(
        &self,
        listing: &Listing,
        descriptions: &mut DescriptionCache<'_>,
    ) -> Result<(), Rejection> {
        self.check_static(listing)?;
        if self.needs_description() {
            let description = descriptions.get(&listing.url).await;
            self.check_description(&description)?;
        }
        Ok(())
    }
}
