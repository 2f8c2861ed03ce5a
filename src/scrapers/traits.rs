use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadyCondition {
    #[default]
    DomContentLoaded,
    Load,
}

/// Capability interface over one live browser page.
///
/// The search and filter code only ever talks to this trait, so the
/// concrete backend (headless_chrome, chromiumoxide, or a scripted fake in
/// tests) is picked once at startup.
#[async_trait]
pub trait BrowserSurface: Send + Sync {
    /// Load `url`, failing with `ScoutError::Navigation` if it cannot be
    /// reached within `timeout`.
    async fn navigate(&self, url: &str, ready: ReadyCondition, timeout: Duration) -> Result<()>;

    /// Serialized HTML of the page as currently rendered.
    async fn rendered_content(&self) -> Result<String>;

    /// Wait until `selector` matches something, or fail with
    /// `ScoutError::Timeout`.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn move_pointer(&self, x: f64, y: f64) -> Result<()>;

    /// Release the browser. Safe to call more than once.
    async fn close(&self);

    /// Get the name of the backend
    fn backend_name(&self) -> &'static str;
}
