use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::agents::AccountScraper;
use crate::browser::BrowserEngine;
use crate::config::Config;
use crate::error::Result;
use crate::storage::PostStore;

/// Outcome of one pass over the configured accounts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub accounts_processed: usize,
    pub posts_scraped: usize,
    pub interrupted: bool,
}

/// Visits every account in order, forever, until told to stop.
pub struct PollLoop<'e, E: BrowserEngine, S: PostStore> {
    scraper: AccountScraper<'e, E>,
    store: S,
    influencers: Vec<String>,
    account_delay: Duration,
    check_interval: Duration,
}

impl<'e, E, S> PollLoop<'e, E, S>
where
    E: BrowserEngine,
    S: PostStore + Sync,
{
    pub fn new(scraper: AccountScraper<'e, E>, store: S, config: &Config) -> Self {
        Self {
            scraper,
            store,
            influencers: config.influencers.clone(),
            account_delay: config.scrape.account_delay_duration(),
            check_interval: config.check_interval_duration(),
        }
    }

    pub async fn run(&self, shutdown: &mut watch::Receiver<bool>) {
        info!("Polling {} accounts: {}", self.influencers.len(), self.influencers.join(", "));

        loop {
            let report = self.run_cycle(shutdown).await;
            if report.interrupted {
                break;
            }

            info!("Waiting {} seconds until next cycle...", self.check_interval.as_secs());
            if !sleep_or_shutdown(self.check_interval, shutdown).await {
                break;
            }
        }

        info!("Poll loop stopped");
    }

    pub async fn run_cycle(&self, shutdown: &mut watch::Receiver<bool>) -> CycleReport {
        info!("Starting scrape cycle...");
        let mut report = CycleReport::default();

        for username in &self.influencers {
            let stop = *shutdown.borrow();
            if stop {
                report.interrupted = true;
                break;
            }

            match AssertUnwindSafe(self.process_account(username)).catch_unwind().await {
                Ok(count) => report.posts_scraped += count,
                Err(_) => error!("Error processing {}: account handler panicked", username),
            }
            report.accounts_processed += 1;

            if !sleep_or_shutdown(self.account_delay, shutdown).await {
                report.interrupted = true;
                break;
            }
        }

        if report.interrupted {
            warn!(
                "Scrape cycle interrupted after {}/{} accounts",
                report.accounts_processed,
                self.influencers.len()
            );
        } else {
            info!(
                "Scrape cycle finished: {} posts from {} accounts",
                report.posts_scraped, report.accounts_processed
            );
        }
        report
    }

    async fn process_account(&self, username: &str) -> usize {
        let posts = self.scraper.scrape_account(username).await;
        let count = posts.len();

        if count > 0 {
            self.store.append_and_cap(posts).await;
        } else {
            debug!("Nothing scraped for {}, store untouched", username);
        }
        count
    }
}

/// Sleep for `duration` unless shutdown is requested first. Returns false on shutdown.
pub async fn sleep_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = Instant::now() + duration;

    loop {
        let stop = *shutdown.borrow_and_update();
        if stop {
            return false;
        }

        tokio::select! {
            _ = sleep_until(deadline) => return true,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    // sender gone, nobody can ask us to stop anymore
                    sleep_until(deadline).await;
                    return true;
                }
            }
        }
    }
}

/// Run the poll loop on `engine` until shutdown, then shut the engine down.
pub async fn run_until_shutdown<E, S>(
    engine: E,
    store: S,
    config: &Config,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    E: BrowserEngine,
    S: PostStore + Sync,
{
    {
        let scraper = AccountScraper::new(&engine, config.scrape.clone());
        let poll_loop = PollLoop::new(scraper, store, config);
        poll_loop.run(&mut shutdown).await;
    }

    engine.shutdown().await
}
