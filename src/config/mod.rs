use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Result, ScrapingError};

pub const DEFAULT_DATA_FILE: &str = "twitter_data.json";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// account handles on the target site
const MAX_ACCOUNT_NAME_LEN: usize = 15;

/// Top-level options. Every key is optional; whatever a file leaves out
/// keeps its default.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub data_path: PathBuf,
    pub check_interval: u64, // milliseconds
    pub influencers: Vec<String>,
    pub browser: EngineConfig,
    pub scrape: ScrapeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub headless: bool,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub selector_timeout: u64, // milliseconds
    pub scroll_steps: u32,
    pub scroll_distance: i64, // pixels
    pub scroll_delay: u64,    // milliseconds
    pub account_delay: u64,   // milliseconds
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            check_interval: 10 * 60 * 1000,
            influencers: vec![
                "zachxbt".to_string(),
                "solanafloor".to_string(),
                "punk6529".to_string(),
            ],
            browser: EngineConfig::default(),
            scrape: ScrapeConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://twitter.com".to_string(),
            selector_timeout: 10_000,
            scroll_steps: 3,
            scroll_distance: 1000,
            scroll_delay: 1000,
            account_delay: 5000,
        }
    }
}

impl Config {
    pub fn check_interval_duration(&self) -> Duration {
        Duration::from_millis(self.check_interval)
    }
}

impl ScrapeConfig {
    pub fn selector_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.selector_timeout)
    }

    pub fn scroll_delay_duration(&self) -> Duration {
        Duration::from_millis(self.scroll_delay)
    }

    pub fn account_delay_duration(&self) -> Duration {
        Duration::from_millis(self.account_delay)
    }

    pub fn timeline_url(&self, username: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), username)
    }
}

/// The store lives next to the executable unless configured otherwise.
pub fn default_data_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_DATA_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
}

#[async_trait::async_trait]
pub trait ConfigManager {
    async fn load_config(&self) -> Result<Config>;
    async fn save_config(&self, config: &Config) -> Result<()>;
    fn validate_config(&self, config: &Config) -> Result<()>;
}

pub struct FileConfigManager {
    config_path: PathBuf,
}

impl FileConfigManager {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }
}

#[async_trait::async_trait]
impl ConfigManager for FileConfigManager {
    async fn load_config(&self) -> Result<Config> {
        info!("Loading configuration from {:?}", self.config_path);

        // check if config file exists, create default if not
        if !self.config_path.exists() {
            warn!("Configuration file not found, creating default config at {:?}", self.config_path);
            self.create_default_config().await?;
        }

        let config_content = fs::read_to_string(&self.config_path)
            .map_err(|e| ScrapingError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&config_content)
            .map_err(|e| ScrapingError::ConfigError(format!("Failed to parse TOML config: {}", e)))?;

        self.validate_config(&config)?;

        info!(
            "Configuration loaded: {} accounts, store at {}",
            config.influencers.len(),
            config.data_path.display()
        );
        Ok(config)
    }

    fn validate_config(&self, config: &Config) -> Result<()> {
        debug!("Validating configuration");

        if config.influencers.is_empty() {
            return Err(ScrapingError::ConfigError("influencers list cannot be empty".to_string()).into());
        }

        for name in &config.influencers {
            if name.trim().is_empty() {
                return Err(ScrapingError::ConfigError("Account name cannot be empty".to_string()).into());
            }
            if name.len() > MAX_ACCOUNT_NAME_LEN {
                return Err(ScrapingError::ConfigError(format!(
                    "Account name '{}' is too long (max {} characters)",
                    name, MAX_ACCOUNT_NAME_LEN
                ))
                .into());
            }
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ScrapingError::ConfigError(format!(
                    "Account name '{}' may only contain letters, digits and underscores",
                    name
                ))
                .into());
            }
        }

        if config.check_interval == 0 {
            return Err(ScrapingError::ConfigError("checkInterval must be greater than 0".to_string()).into());
        }
        if config.scrape.selector_timeout == 0 {
            return Err(ScrapingError::ConfigError("selectorTimeout must be greater than 0".to_string()).into());
        }
        if !config.scrape.base_url.starts_with("http://") && !config.scrape.base_url.starts_with("https://") {
            return Err(ScrapingError::ConfigError("baseUrl must start with http:// or https://".to_string()).into());
        }

        debug!("Configuration validation passed");
        Ok(())
    }

    async fn save_config(&self, config: &Config) -> Result<()> {
        info!("Saving configuration to {:?}", self.config_path);

        let toml_content = toml::to_string_pretty(config)
            .map_err(|e| ScrapingError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(&self.config_path, toml_content)
            .map_err(|e| ScrapingError::ConfigError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

impl FileConfigManager {
    async fn create_default_config(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ScrapingError::ConfigError(format!("Failed to create config directory: {}", e)))?;
        }

        self.save_config(&Config::default()).await?;
        info!("Default configuration file created at {:?}", self.config_path);
        Ok(())
    }
}
