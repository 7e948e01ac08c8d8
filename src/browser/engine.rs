use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::parser::RawPost;

/// A launched browser with one isolated browsing context. Owned by whoever
/// launched it and shut down exactly once.
#[async_trait]
pub trait BrowserEngine: Send + Sync + Sized {
    type Page: TimelinePage;

    /// Open a fresh page inside the engine's browsing context.
    async fn new_page(&self) -> Result<Self::Page>;

    async fn shutdown(self) -> Result<()>;
}

/// The page operations an account scrape needs, nothing more.
#[async_trait]
pub trait TimelinePage: Send + Sync + Sized {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Fails with a timeout error if nothing matches `selector` in time.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn scroll_by(&self, pixels: i64) -> Result<()>;

    /// Project every rendered post element into a raw record.
    async fn extract_posts(&self) -> Result<Vec<RawPost>>;

    async fn close(self) -> Result<()>;
}
