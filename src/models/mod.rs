use serde::{Deserialize, Serialize};
use std::fmt;

/// One rental advertisement parsed from a search results card.
///
/// Identity is `listing_id`: two records with the same id are the same
/// listing no matter when they were scraped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    pub listing_id: String,
    pub url: String,
    pub address: String,
    pub neighborhood: String,
    /// Monthly rent in whole dollars. `None` when the card carried no
    /// readable price.
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
}

impl PartialEq for Listing {
    fn eq(&self, other: &Self) -> bool {
        self.listing_id == other.listing_id
    }
}

impl Eq for Listing {}

/// The listing fields that blocked-substring rules can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingField {
    Url,
    Address,
    Neighborhood,
}

impl ListingField {
    pub fn value<'a>(&self, listing: &'a Listing) -> &'a str {
        match self {
            ListingField::Url => &listing.url,
            ListingField::Address => &listing.address,
            ListingField::Neighborhood => &listing.neighborhood,
        }
    }
}

impl fmt::Display for ListingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListingField::Url => "url",
            ListingField::Address => "address",
            ListingField::Neighborhood => "neighborhood",
        };
        f.write_str(name)
    }
}

/// What the tenant is looking for. Fixed for the duration of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    /// Unset bounds fall back to the rule set's default price window
    pub min_price: Option<u32>,
    pub max_price: Option<u32>,
    pub min_beds: u8,
    pub max_beds: u8,
    pub min_baths: u8,
    /// Neighborhood names, resolved through the area code map in this order
    pub areas: Vec<String>,
    /// Site amenity codes such as `pets` or `dishwasher`
    pub amenities: Vec<String>,
    pub no_fee_only: bool,
    /// Reject addresses on streets numbered above this
    pub max_street_number: Option<u32>,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            min_price: Some(0),
            max_price: Some(2500),
            min_beds: 0,
            max_beds: 1,
            min_baths: 1,
            areas: DEFAULT_AREAS.iter().map(|a| a.to_string()).collect(),
            amenities: Vec::new(),
            no_fee_only: false,
            max_street_number: Some(70),
        }
    }
}

/// Manhattan below 70th Street.
pub const DEFAULT_AREAS: &[&str] = &[
    "Midtown",
    "Midtown East",
    "Midtown West",
    "Midtown South",
    "Chelsea",
    "West Chelsea",
    "Gramercy Park",
    "Flatiron",
    "NoMad",
    "Kips Bay",
    "Murray Hill",
    "Turtle Bay",
    "Sutton Place",
    "Beekman",
    "East Village",
    "West Village",
    "Greenwich Village",
    "Nolita",
    "Little Italy",
    "Chinatown",
    "Two Bridges",
    "Lower East Side",
    "Tribeca",
    "Financial District",
    "Battery Park City",
    "Hudson Yards",
    "Hudson Square",
    "Hell's Kitchen",
    "Stuyvesant Town/PCV",
];

/// Raw cards parsed from one fetched results page, before dedup and filtering.
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub page: u32,
    pub listings: Vec<Listing>,
    /// A bot-detection interstitial was seen while loading this page
    pub challenged: bool,
}

/// Why pagination stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// A page produced no listings that were both new to this run and accepted
    Exhausted,
    /// No listing cards rendered within the wait window
    NoListings,
    /// Navigation or the browser session failed
    Aborted(String),
    /// The caller interrupted the run
    Cancelled,
}

impl Termination {
    /// `Exhausted` and `NoListings` are the normal end of a search.
    pub fn is_done(&self) -> bool {
        matches!(self, Termination::Exhausted | Termination::NoListings)
    }
}

/// Accepted, newly seen listings from one run, in discovery order.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub listings: Vec<Listing>,
    pub pages_fetched: u32,
    pub challenges: u32,
    pub termination: Termination,
}

impl RunResult {
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }
}
