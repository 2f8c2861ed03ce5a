use crate::error::Result;
use crate::models::SearchCriteria;
use crate::scrapers::areas::AreaCodeMap;

const BASE_URL: &str = "https://streeteasy.com/for-rent/nyc";
const SORT_SUFFIX: &str = "?sort_by=listed_desc";

/// A search URL built from criteria, ready to be paginated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// `key:value` segments in the order the site expects
    segments: Vec<(&'static str, String)>,
    url: String,
}

impl SearchQuery {
    /// Encode `criteria` into the site's `key:value|key:value` syntax.
    ///
    /// `price_window` is the effective window after defaults are applied.
    /// Unknown neighborhood names fail here, before anything is fetched.
    pub fn build(
        criteria: &SearchCriteria,
        price_window: (u32, u32),
        areas: &AreaCodeMap,
    ) -> Result<Self> {
        let codes = areas.resolve(&criteria.areas)?;
        let (min_price, max_price) = price_window;

        // Empty values stay in the query: the site's parser expects every key.
        let segments = vec![
            ("status", "open".to_string()),
            ("price", format!("{}-{}", min_price, max_price)),
            ("area", codes.join(",")),
            ("beds", format!("{}-{}", criteria.min_beds, criteria.max_beds)),
            ("baths", format!(">={}", criteria.min_baths)),
            ("amenities", criteria.amenities.join(",")),
            (
                "no_fee",
                if criteria.no_fee_only { "1".to_string() } else { String::new() },
            ),
        ];

        let q = segments
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join("|");
        let url = format!("{}/{}{}", BASE_URL, q, SORT_SUFFIX);

        Ok(Self { segments, url })
    }

    /// The first-page URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Page 1 is the bare query; later pages add a page index.
    pub fn page_url(&self, page: u32) -> String {
        if page > 1 {
            format!("{}&page={}", self.url, page)
        } else {
            self.url.clone()
        }
    }

    pub fn segment(&self, key: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn segments(&self) -> &[(&'static str, String)] {
        &self.segments
    }
}
