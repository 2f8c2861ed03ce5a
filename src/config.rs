//! TOML configuration with environment overrides.
//!
//! A missing config file is not an error: every section has defaults that
//! reproduce the stock search (Manhattan below 70th Street, up to $2,500).

use crate::error::ScoutError;
use crate::models::SearchCriteria;
use crate::scrapers::areas::AreaCodeMap;
use crate::scrapers::filters::RuleSet;
use crate::scrapers::types::{BrowserOptions, Pacing};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchCriteria,
    pub rules: RuleSet,
    pub browser: BrowserOptions,
    pub pacing: Pacing,
    pub output: OutputConfig,
    /// JSON list of `{name, id}` entries layered over the built-in area codes
    pub areas_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the accepted listings of the latest run are written
    pub results_path: PathBuf,
    /// Listings reported by earlier runs
    pub seen_path: PathBuf,
    /// Preview only: do not record results in the seen store
    pub dry_run: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from("listings.json"),
            seen_path: PathBuf::from("data/seen_listings.json"),
            dry_run: true,
        }
    }
}

impl AppConfig {
    /// Load `path`, falling back to defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            debug!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, then apply `RENTAL_SCOUT_*` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`. Split out from `load_with_env` so the
    /// parsing can be tested without touching the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("RENTAL_SCOUT_HEADLESS") {
            self.browser.headless = parse_env("RENTAL_SCOUT_HEADLESS", &val)?;
            debug!("Override browser.headless from env: {}", self.browser.headless);
        }
        if let Some(val) = lookup("RENTAL_SCOUT_BACKEND") {
            self.browser.backend = val
                .parse()
                .map_err(|e: String| ScoutError::Config(e))?;
            debug!("Override browser.backend from env: {:?}", self.browser.backend);
        }
        if let Some(val) = lookup("RENTAL_SCOUT_DRY_RUN") {
            self.output.dry_run = parse_env("RENTAL_SCOUT_DRY_RUN", &val)?;
            debug!("Override output.dry_run from env: {}", self.output.dry_run);
        }
        if let Some(val) = lookup("RENTAL_SCOUT_MAX_STREET") {
            self.search.max_street_number = if val.trim().is_empty() {
                None
            } else {
                Some(parse_env("RENTAL_SCOUT_MAX_STREET", &val)?)
            };
            debug!(
                "Override search.max_street_number from env: {:?}",
                self.search.max_street_number
            );
        }
        Ok(())
    }

    /// Reject settings that would make a run meaningless. Price and bed
    /// bounds are checked here so the core never has to.
    pub fn validate(&self) -> std::result::Result<(), ScoutError> {
        let (min, max) = self.rules.price_window(&self.search);
        if min > max {
            return Err(ScoutError::Config(format!(
                "min price {} is above max price {}",
                min, max
            )));
        }
        if self.search.min_beds > self.search.max_beds {
            return Err(ScoutError::Config(format!(
                "min beds {} is above max beds {}",
                self.search.min_beds, self.search.max_beds
            )));
        }
        Ok(())
    }

    /// The area code table, including any override file.
    pub fn area_codes(&self) -> Result<AreaCodeMap> {
        match &self.areas_file {
            Some(path) => AreaCodeMap::with_overrides(path),
            None => Ok(AreaCodeMap::builtin()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, val: &str) -> std::result::Result<T, ScoutError> {
    val.trim()
        .parse()
        .map_err(|_| ScoutError::Config(format!("{} has invalid value '{}'", key, val)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::types::Backend;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.search.max_price, Some(2500));
        assert_eq!(config.rules.blocked.url, vec!["?featured=1", "?infeed=1"]);
        assert_eq!(config.rules.description_keywords.len(), 16);
        assert!(config.output.dry_run);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.backend, Backend::HeadlessChrome);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [search]
            max_price = 3200
            areas = ["Chelsea", "Bushwick"]
            max_street_number = 30

            [rules]
            description_keywords = ["lottery"]

            [browser]
            backend = "chromiumoxide"
            headless = true

            [pacing]
            between_pages = { min_ms = 5000, max_ms = 9000 }
            "#,
        )
        .unwrap();
        assert_eq!(config.search.max_price, Some(3200));
        assert_eq!(config.search.min_price, Some(0));
        assert_eq!(config.search.areas, vec!["Chelsea", "Bushwick"]);
        assert_eq!(config.search.max_street_number, Some(30));
        assert_eq!(config.rules.description_keywords, vec!["lottery"]);
        assert_eq!(config.rules.blocked.neighborhood, vec!["New Development"]);
        assert_eq!(config.browser.backend, Backend::Chromiumoxide);
        assert!(config.browser.headless);
        assert_eq!(config.pacing.between_pages.max_ms, 9000);
        assert_eq!(config.pacing.challenge_timeout_secs, 60);
    }

    #[test]
    fn test_inverted_price_rejected() {
        let err = AppConfig::from_toml("[search]\nmin_price = 3000\nmax_price = 1000\n").unwrap_err();
        assert!(err.to_string().contains("min price"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.search.areas.len(), 29);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("RENTAL_SCOUT_HEADLESS", "true"),
            ("RENTAL_SCOUT_BACKEND", "chromiumoxide"),
            ("RENTAL_SCOUT_DRY_RUN", "false"),
            ("RENTAL_SCOUT_MAX_STREET", ""),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert!(config.browser.headless);
        assert_eq!(config.browser.backend, Backend::Chromiumoxide);
        assert!(!config.output.dry_run);
        assert_eq!(config.search.max_street_number, None);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|k| (k == "RENTAL_SCOUT_MAX_STREET").then(|| "ninety".to_string()));
        assert!(result.is_err());
    }
}
