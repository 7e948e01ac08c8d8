use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::browser::engine::{BrowserEngine, TimelinePage};
use crate::config::EngineConfig;
use crate::error::{Result, ScrapingError};
use crate::parser::{RawPost, TimelineParser};

const PAGE_OPEN_TIMEOUT: Duration = Duration::from_secs(10);
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless Chrome driven over CDP
pub struct ChromeEngine {
    browser: Browser,
    context_id: BrowserContextId,
    user_agent: String,
    user_data_dir: PathBuf,
    handler_task: JoinHandle<()>,
    parser: Arc<TimelineParser>,
}

impl ChromeEngine {
    pub async fn launch(config: &EngineConfig) -> Result<Self> {
        let parser = TimelineParser::new()?;

        // unique profile dir so parallel runs don't fight over the singleton lock
        let user_data_dir = std::env::temp_dir().join(format!(
            "timeline-scraper-{}-{}",
            std::process::id(),
            Uuid::new_v4()
        ));
        std::fs::create_dir_all(&user_data_dir)
            .map_err(|e| ScrapingError::LaunchError(format!("Failed to create profile directory: {}", e)))?;

        match Self::launch_in(config, &user_data_dir, parser).await {
            Ok(engine) => Ok(engine),
            Err(e) => {
                let _ = std::fs::remove_dir_all(&user_data_dir);
                Err(e)
            }
        }
    }

    async fn launch_in(config: &EngineConfig, user_data_dir: &Path, parser: TimelineParser) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(user_data_dir)
            .args(vec![
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-extensions",
                "--mute-audio",
                "--no-first-run",
                "--disable-default-apps",
                "--disable-sync",
                "--disable-blink-features=AutomationControlled",    // hide automation
            ]);
        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScrapingError::LaunchError(format!("Failed to create browser config: {}", e)))?;

        info!("Launching browser (headless: {})", config.headless);
        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScrapingError::LaunchError(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    // filter out common websocket deserialization errors
                    let error_msg = e.to_string();
                    if error_msg.contains("data did not match any variant")
                        || error_msg.contains("untagged enum Message")
                    {
                        debug!("Ignoring WebSocket deserialization error: {}", e);
                    } else {
                        warn!("Browser handler error: {}", e);
                    }
                }
            }
            debug!("Browser handler task ended");
        });

        let context_id = match browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                return Err(ScrapingError::LaunchError(format!("Failed to create browsing context: {}", e)).into());
            }
        };

        info!("Browser initialized");
        Ok(Self {
            browser,
            context_id,
            user_agent: config.user_agent.clone(),
            user_data_dir: user_data_dir.to_path_buf(),
            handler_task,
            parser: Arc::new(parser),
        })
    }
}

#[async_trait]
impl BrowserEngine for ChromeEngine {
    type Page = ChromePage;

    async fn new_page(&self) -> Result<ChromePage> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.context_id.clone())
            .build()
            .map_err(|e| ScrapingError::BrowserError(format!("Failed to build page params: {}", e)))?;

        let page = match tokio::time::timeout(PAGE_OPEN_TIMEOUT, self.browser.new_page(params)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                return Err(ScrapingError::BrowserError(format!("Failed to create new page: {}", e)).into());
            }
            Err(_) => {
                return Err(ScrapingError::TimeoutError("creating new page".to_string()).into());
            }
        };

        let user_agent_params = SetUserAgentOverrideParams::builder()
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ScrapingError::BrowserError(format!("Failed to build user agent params: {}", e)))?;

        if let Err(e) = page.execute(user_agent_params).await {
            let _ = page.close().await;
            return Err(ScrapingError::BrowserError(format!("Failed to set user agent: {}", e)).into());
        }

        Ok(ChromePage {
            page,
            parser: self.parser.clone(),
        })
    }

    async fn shutdown(mut self) -> Result<()> {
        info!("Closing browser");
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("Failed waiting for browser process to exit: {}", e);
        }
        self.handler_task.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!("Could not remove profile directory {}: {}", self.user_data_dir.display(), e);
        }

        closed
            .map(|_| ())
            .map_err(|e| ScrapingError::BrowserError(format!("Failed to close browser: {}", e)).into())
    }
}

pub struct ChromePage {
    page: Page,
    parser: Arc<TimelineParser>,
}

#[async_trait]
impl TimelinePage for ChromePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ScrapingError::BrowserError(format!("Failed to navigate to {}: {}", url, e)))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let poll = async {
            while self.page.find_element(selector).await.is_err() {
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll).await.map_err(|_| {
            ScrapingError::TimeoutError(format!("{} did not appear within {:?}", selector, timeout))
        })?;
        Ok(())
    }

    async fn scroll_by(&self, pixels: i64) -> Result<()> {
        let script = format!("window.scrollBy(0, {})", pixels);
        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ScrapingError::BrowserError(format!("Failed to scroll: {}", e)))?;
        Ok(())
    }

    async fn extract_posts(&self) -> Result<Vec<RawPost>> {
        let html = self
            .page
            .content()
            .await
            .map_err(|e| ScrapingError::BrowserError(format!("Failed to get page content: {}", e)))?;

        Ok(self.parser.parse_timeline_html(&html))
    }

    async fn close(self) -> Result<()> {
        self.page
            .close()
            .await
            .map_err(|e| ScrapingError::BrowserError(format!("Failed to close page: {}", e)))?;
        Ok(())
    }
}
