//! Neighborhood name to site area code lookup.

use crate::error::{Result, ScoutError};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Built-in area codes, keyed by the exact label the site uses.
const BUILTIN_AREAS: &[(&str, &str)] = &[
    // Manhattan
    ("Battery Park City", "103"),
    ("Chelsea", "115"),
    ("West Chelsea", "158"),
    ("Chinatown", "104"),
    ("East Village", "117"),
    ("Financial District", "105"),
    ("Flatiron", "116"),
    ("Gramercy Park", "118"),
    ("Greenwich Village", "119"),
    ("Hudson Square", "160"),
    ("Hudson Yards", "162"),
    ("Kips Bay", "122"),
    ("Little Italy", "106"),
    ("Lower East Side", "107"),
    ("Midtown", "120"),
    ("Midtown East", "123"),
    ("Midtown South", "124"),
    ("Midtown West", "125"),
    ("Hell's Kitchen", "126"),
    ("Murray Hill", "127"),
    ("NoMad", "163"),
    ("Noho", "108"),
    ("Nolita", "109"),
    ("Soho", "110"),
    ("Stuyvesant Town/PCV", "121"),
    ("Beekman", "128"),
    ("Sutton Place", "129"),
    ("Turtle Bay", "130"),
    ("Tribeca", "111"),
    ("Two Bridges", "112"),
    ("West Village", "157"),
    ("Upper East Side", "139"),
    ("Carnegie Hill", "140"),
    ("Lenox Hill", "141"),
    ("Yorkville", "142"),
    ("Upper West Side", "135"),
    ("Morningside Heights", "137"),
    ("Hamilton Heights", "143"),
    ("Washington Heights", "144"),
    ("Inwood", "145"),
    ("West Harlem", "146"),
    ("Central Harlem", "147"),
    ("South Harlem", "148"),
    ("East Harlem", "149"),
    // Brooklyn
    ("Bay Ridge", "301"),
    ("Bedford-Stuyvesant", "302"),
    ("Stuyvesant Heights", "364"),
    ("Bensonhurst", "303"),
    ("Boerum Hill", "304"),
    ("Borough Park", "305"),
    ("Brighton Beach", "306"),
    ("Brooklyn Heights", "307"),
    ("Brownsville", "308"),
    ("Bushwick", "309"),
    ("Canarsie", "310"),
    ("Carroll Gardens", "311"),
    ("Clinton Hill", "312"),
    ("Cobble Hill", "313"),
    ("Coney Island", "314"),
    ("Crown Heights", "315"),
    ("Cypress Hills", "316"),
    ("Downtown Brooklyn", "318"),
    ("DUMBO", "319"),
    ("Dyker Heights", "320"),
    ("East Flatbush", "321"),
    ("East New York", "322"),
    ("East Williamsburg", "365"),
    ("Flatbush", "323"),
    ("Flatlands", "324"),
    ("Fort Greene", "325"),
    ("Fort Hamilton", "326"),
    ("Gowanus", "327"),
    ("Greenpoint", "328"),
    ("Kensington", "329"),
    ("Marine Park", "330"),
    ("Midwood", "331"),
    ("Ocean Hill", "332"),
    ("Park Slope", "333"),
    ("Prospect Heights", "334"),
    ("Prospect Lefferts Gardens", "335"),
    ("Prospect Park South", "336"),
    ("Red Hook", "337"),
    ("Sunset Park", "338"),
    ("Vinegar Hill", "339"),
    ("Weeksville", "340"),
    ("Williamsburg", "341"),
    ("Windsor Terrace", "342"),
    // Queens
    ("Astoria", "401"),
    ("Corona", "402"),
    ("Ditmars-Steinway", "403"),
    ("Elmhurst", "404"),
    ("Flushing", "405"),
    ("Forest Hills", "406"),
    ("Glendale", "407"),
    ("Jackson Heights", "408"),
    ("Long Island City", "409"),
    ("Maspeth", "410"),
    ("Middle Village", "411"),
    ("Rego Park", "412"),
    ("Ridgewood", "413"),
    ("Sunnyside", "414"),
    ("Woodside", "415"),
];

/// One entry of an `areas.json` override file.
#[derive(Debug, Deserialize)]
struct AreaEntry {
    name: String,
    id: serde_json::Value,
}

/// Static lookup from neighborhood name to the site's internal area code.
#[derive(Debug, Clone)]
pub struct AreaCodeMap {
    codes: HashMap<String, String>,
}

impl AreaCodeMap {
    /// The built-in table.
    pub fn builtin() -> Self {
        let codes = BUILTIN_AREAS
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()))
            .collect();
        Self { codes }
    }

    /// The built-in table with entries from a JSON file layered on top.
    ///
    /// The file is an array of `{"name": ..., "id": ...}` objects; ids may be
    /// numbers or strings.
    pub fn with_overrides(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read area file {}", path.display()))?;
        let mut map = Self::builtin();
        let added = map.merge_json(&raw)?;
        tracing::debug!("Loaded {} area codes from {}", added, path.display());
        Ok(map)
    }

    fn merge_json(&mut self, raw: &str) -> anyhow::Result<usize> {
        let entries: Vec<AreaEntry> =
            serde_json::from_str(raw).context("Area file is not a list of {name, id}")?;
        let count = entries.len();
        for entry in entries {
            let code = match entry.id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            self.codes.insert(entry.name, code);
        }
        Ok(count)
    }

    pub fn code(&self, name: &str) -> Option<&str> {
        self.codes.get(name).map(String::as_str)
    }

    /// Resolve every name in order, failing on the first unknown one.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<String>> {
        names
            .iter()
            .map(|name| {
                self.code(name)
                    .map(str::to_string)
                    .ok_or_else(|| ScoutError::UnknownArea(name.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for AreaCodeMap {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_AREAS;

    #[test]
    fn test_builtin_covers_default_areas() {
        let map = AreaCodeMap::builtin();
        for area in DEFAULT_AREAS {
            assert!(map.code(area).is_some(), "missing code for {}", area);
        }
    }

    #[test]
    fn test_resolve_keeps_input_order() {
        let map = AreaCodeMap::builtin();
        let names = vec!["Tribeca".to_string(), "Chelsea".to_string()];
        assert_eq!(map.resolve(&names).unwrap(), vec!["111", "115"]);
    }

    #[test]
    fn test_resolve_unknown_area() {
        let map = AreaCodeMap::builtin();
        let names = vec!["Chelsea".to_string(), "Atlantis".to_string()];
        match map.resolve(&names) {
            Err(ScoutError::UnknownArea(name)) => assert_eq!(name, "Atlantis"),
            other => panic!("expected UnknownArea, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_is_exact() {
        let map = AreaCodeMap::builtin();
        assert!(map.code("chelsea").is_none());
    }

    #[test]
    fn test_merge_json_overrides() {
        let mut map = AreaCodeMap::builtin();
        let added = map
            .merge_json(r#"[{"name": "Chelsea", "id": 999}, {"name": "Roosevelt Island", "id": "150"}]"#)
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(map.code("Chelsea"), Some("999"));
        assert_eq!(map.code("Roosevelt Island"), Some("150"));
    }
}
