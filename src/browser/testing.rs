//! In-memory stand-in for the browser so scraping logic runs without Chrome.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::browser::engine::{BrowserEngine, TimelinePage};
use crate::error::{Result, ScrapingError};
use crate::parser::RawPost;

#[derive(Debug, Clone)]
pub enum FakeTimeline {
    Posts(Vec<RawPost>),
    /// the post selector never shows up
    NoPosts,
    NavigationFails,
    ExtractionFails,
}

#[derive(Debug, Default)]
pub struct FakeBrowserState {
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub scrolls: AtomicUsize,
    pub visited: Mutex<Vec<String>>,
}

impl FakeBrowserState {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

pub struct FakeEngine {
    timelines: HashMap<String, FakeTimeline>,
    fail_new_page: bool,
    state: Arc<FakeBrowserState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            timelines: HashMap::new(),
            fail_new_page: false,
            state: Arc::new(FakeBrowserState::default()),
        }
    }

    pub fn with_timeline(mut self, username: &str, timeline: FakeTimeline) -> Self {
        self.timelines.insert(username.to_string(), timeline);
        self
    }

    pub fn failing_new_page(mut self) -> Self {
        self.fail_new_page = true;
        self
    }

    pub fn state(&self) -> Arc<FakeBrowserState> {
        self.state.clone()
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    type Page = FakePage;

    async fn new_page(&self) -> Result<FakePage> {
        if self.fail_new_page {
            return Err(ScrapingError::BrowserError("page creation refused".to_string()).into());
        }

        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(FakePage {
            timelines: self.timelines.clone(),
            loaded: Mutex::new(None),
            state: self.state.clone(),
        })
    }

    async fn shutdown(self) -> Result<()> {
        self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    timelines: HashMap<String, FakeTimeline>,
    loaded: Mutex<Option<FakeTimeline>>,
    state: Arc<FakeBrowserState>,
}

impl FakePage {
    fn loaded(&self) -> Option<FakeTimeline> {
        self.loaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimelinePage for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.state.visited.lock().unwrap().push(url.to_string());

        let username = url.rsplit('/').next().unwrap_or_default();
        let timeline = self
            .timelines
            .get(username)
            .cloned()
            .unwrap_or(FakeTimeline::NoPosts);

        if let FakeTimeline::NavigationFails = timeline {
            return Err(ScrapingError::BrowserError(format!("net::ERR_CONNECTION_RESET at {}", url)).into());
        }

        *self.loaded.lock().unwrap() = Some(timeline);
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        match self.loaded() {
            Some(FakeTimeline::NoPosts) => Err(ScrapingError::TimeoutError(format!(
                "{} did not appear within {:?}",
                selector, timeout
            ))
            .into()),
            Some(_) => Ok(()),
            None => Err(ScrapingError::BrowserError("no page loaded".to_string()).into()),
        }
    }

    async fn scroll_by(&self, _pixels: i64) -> Result<()> {
        self.state.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn extract_posts(&self) -> Result<Vec<RawPost>> {
        match self.loaded() {
            Some(FakeTimeline::Posts(posts)) => Ok(posts),
            Some(FakeTimeline::ExtractionFails) => {
                Err(ScrapingError::ParseError("evaluation threw".to_string()).into())
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn close(self) -> Result<()> {
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn raw_posts(prefix: &str, count: usize) -> Vec<RawPost> {
    (0..count)
        .map(|i| RawPost {
            text: format!("{} post {}", prefix, i),
            timestamp: format!("2024-01-15T10:3{}:00.000Z", i % 10),
            likes: i.to_string(),
            retweets: "0".to_string(),
        })
        .collect()
}
