use thiserror::Error;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Error, Debug)]
pub enum ScrapingError {
    #[error("Browser error: {0}")]
    BrowserError(String),

    #[error("Browser launch error: {0}")]
    LaunchError(String),

    #[error("Timed out: {0}")]
    TimeoutError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
