//! Listings recorded by previous runs.

use crate::models::Listing;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Source of listing ids that have already been reported.
pub trait DedupOracle: Send + Sync {
    /// Queried once at the start of each run.
    fn existing_ids(&self) -> Result<HashSet<String>>;
}

/// A dedup oracle that can also record newly reported listings.
pub trait SeenStore: DedupOracle {
    fn insert(&self, listings: &[Listing]) -> Result<usize>;
}

/// Fixed in-memory id set.
#[derive(Debug, Default)]
pub struct MemoryOracle {
    ids: Mutex<HashSet<String>>,
}

impl MemoryOracle {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Mutex::new(ids.into_iter().map(Into::into).collect()),
        }
    }
}

impl DedupOracle for MemoryOracle {
    fn existing_ids(&self) -> Result<HashSet<String>> {
        let ids = self
            .ids
            .lock()
            .map_err(|_| anyhow::anyhow!("oracle lock poisoned"))?;
        Ok(ids.clone())
    }
}

impl SeenStore for MemoryOracle {
    fn insert(&self, listings: &[Listing]) -> Result<usize> {
        let mut ids = self
            .ids
            .lock()
            .map_err(|_| anyhow::anyhow!("oracle lock poisoned"))?;
        Ok(listings
            .iter()
            .filter(|l| ids.insert(l.listing_id.clone()))
            .count())
    }
}

/// A listing as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub recorded_at: DateTime<Utc>,
}

/// Seen listings kept in a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonSeenStore {
    path: PathBuf,
}

impl JsonSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All recorded listings, oldest first. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<RecordedListing>> {
        if !self.path.exists() {
            debug!("Seen store {} not found, starting empty", self.path.display());
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read seen store {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Seen store {} is not valid JSON", self.path.display()))
    }

    fn save(&self, records: &[RecordedListing]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl DedupOracle for JsonSeenStore {
    fn existing_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .load()?
            .into_iter()
            .map(|r| r.listing.listing_id)
            .collect())
    }
}

impl SeenStore for JsonSeenStore {
    fn insert(&self, listings: &[Listing]) -> Result<usize> {
        let mut records = self.load()?;
        let mut known: HashSet<String> =
            records.iter().map(|r| r.listing.listing_id.clone()).collect();
        let now = Utc::now();

        let before = records.len();
        for listing in listings {
            if known.insert(listing.listing_id.clone()) {
                records.push(RecordedListing {
                    listing: listing.clone(),
                    recorded_at: now,
                });
            }
        }
        let added = records.len() - before;

        if added > 0 {
            self.save(&records)?;
            info!("💾 Recorded {} new listings in {}", added, self.path.display());
        }
        Ok(added)
    }
}
