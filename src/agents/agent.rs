use chrono::Utc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserEngine, TimelinePage};
use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapingError};
use crate::parser::{stamp_batch, Post, POST_SELECTOR};

/// Drives one navigate/scroll/extract pass per account on a borrowed engine.
pub struct AccountScraper<'e, E: BrowserEngine> {
    engine: &'e E,
    settings: ScrapeConfig,
}

impl<'e, E: BrowserEngine> AccountScraper<'e, E> {
    pub fn new(engine: &'e E, settings: ScrapeConfig) -> Self {
        Self { engine, settings }
    }

    /// Never fails: any error is logged and yields an empty batch.
    pub async fn scrape_account(&self, username: &str) -> Vec<Post> {
        info!("Scraping posts for {}", username);

        let page = match self.engine.new_page().await {
            Ok(page) => page,
            Err(e) => {
                error!("Error scraping {}: {}", username, e);
                return Vec::new();
            }
        };

        let outcome = self.scrape_on_page(&page, username).await;

        // the page goes away whatever happened above
        if let Err(e) = page.close().await {
            warn!("Failed to close page for {}: {}", username, e);
        }

        match outcome {
            Ok(posts) => {
                info!("Scraped {} posts for {}", posts.len(), username);
                posts
            }
            Err(e) => {
                if let Some(ScrapingError::TimeoutError(_)) = e.downcast_ref::<ScrapingError>() {
                    warn!("No posts rendered for {}: {}", username, e);
                } else {
                    error!("Error scraping {}: {}", username, e);
                }
                Vec::new()
            }
        }
    }

    async fn scrape_on_page(&self, page: &E::Page, username: &str) -> Result<Vec<Post>> {
        let url = self.settings.timeline_url(username);
        debug!("Navigating to {}", url);
        page.navigate(&url).await?;

        page.wait_for_selector(POST_SELECTOR, self.settings.selector_timeout_duration())
            .await?;

        // lazy-load a few more screens of posts
        for step in 1..=self.settings.scroll_steps {
            page.scroll_by(self.settings.scroll_distance).await?;
            sleep(self.settings.scroll_delay_duration()).await;
            debug!("Scroll {}/{} done for {}", step, self.settings.scroll_steps, username);
        }

        let raw_posts = page.extract_posts().await?;
        Ok(stamp_batch(raw_posts, username, Utc::now()))
    }
}
