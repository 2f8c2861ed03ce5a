//! Rental listing monitor.
//!
//! Drives a real browser through a rental site's paginated search results,
//! waits out bot challenges, parses listing cards and reports only new
//! listings that pass a chain of client-side filters.

pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod scrapers;
pub mod store;

pub use config::AppConfig;
pub use error::{Result, ScoutError};
pub use models::{Listing, PageResult, RunResult, SearchCriteria, Termination};
pub use monitor::{forward_interrupts, run_monitor, RunPlan};
pub use store::{DedupOracle, JsonSeenStore, MemoryOracle, SeenStore};
