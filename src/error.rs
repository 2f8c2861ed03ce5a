use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoutError>;

/// Errors raised by the scraping core.
///
/// Bot challenges and missing card fields are deliberately absent: both are
/// handled in place and never surface to the caller.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// The browser could not reach a page. Aborts the run with partial results.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// An expected element never appeared. Treated as end-of-results.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A neighborhood name with no entry in the area code map.
    #[error("unknown area name: {0}")]
    UnknownArea(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ScoutError {
    /// Whether this error means "the element never showed up" rather than a
    /// broken session.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScoutError::Timeout(_))
    }
}
