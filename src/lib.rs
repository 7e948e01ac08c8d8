pub mod agents;
pub mod browser;
pub mod config;
pub mod error;
pub mod parser;
pub mod storage;

pub use error::{Result, ScrapingError};
pub use config::Config;
pub use agents::{run_until_shutdown, AccountScraper, PollLoop};
pub use browser::ChromeEngine;
pub use storage::JsonFileStore;
