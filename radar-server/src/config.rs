//! Server configuration
//!
//! Settings are read from a TOML file and then overridden by a handful of
//! environment variables, so secrets never have to live in the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use radar_client::config::CompletionConfig;
use radar_core::dto::meta::MetaResponse;
use radar_pipeline::config::{
    CrawlConfig, EmailConfig, ProcessorConfig, SchedulerConfig, parse_duration,
};
use serde::Deserialize;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "radar.toml";

/// Server configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub crawl: CrawlConfig,
    pub scheduler: SchedulerConfig,
    pub processor: ProcessorConfig,
    pub completion: CompletionConfig,
    pub email: EmailConfig,
    pub notifier: NotifierConfig,
    pub subscription: SubscriptionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8080")
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://jobs.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// One of `email`, `log` or `none`
    pub driver: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            driver: "email".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    pub allowed_channels: Vec<String>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            allowed_channels: vec!["email".to_string()],
        }
    }
}

/// How new jobs are announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierDriver {
    Email,
    Log,
    None,
}

impl FromStr for NotifierDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "email" => Ok(NotifierDriver::Email),
            "log" => Ok(NotifierDriver::Log),
            "none" | "off" | "disabled" => Ok(NotifierDriver::None),
            other => Err(format!("unknown notifier driver: {}", other)),
        }
    }
}

impl Config {
    /// Loads the configuration file and applies environment overrides
    ///
    /// Without an explicit path `RADAR_CONFIG` is consulted, then
    /// `radar.toml`; a missing default file yields the defaults. An explicit
    /// path that does not exist is an error.
    ///
    /// Environment overrides:
    /// - DATABASE_URL
    /// - RADAR_BIND_ADDR
    /// - RADAR_INTERVAL
    /// - DEEPSEEK_API_KEY
    /// - SMTP_PASSWORD
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("RADAR_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                tracing::info!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Reads a TOML configuration file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies non-empty values returned by `lookup` over the file settings
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(addr) = get("RADAR_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(interval) = get("RADAR_INTERVAL") {
            self.scheduler.interval = interval;
        }
        if let Some(key) = get("DEEPSEEK_API_KEY") {
            self.completion.api_key = key;
        }
        if let Some(password) = get("SMTP_PASSWORD") {
            self.email.password = password;
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.bind_addr.trim().is_empty() {
            anyhow::bail!("server.bind_addr cannot be empty");
        }

        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url cannot be empty");
        }

        if parse_duration(&self.scheduler.timeout).is_none() {
            anyhow::bail!(
                "scheduler.timeout must be a positive duration, got {:?}",
                self.scheduler.timeout
            );
        }

        self.notifier_driver().map_err(anyhow::Error::msg)?;

        Ok(())
    }

    pub fn notifier_driver(&self) -> Result<NotifierDriver, String> {
        self.notifier.driver.parse()
    }

    /// Candidate lists served by `GET /api/meta`
    pub fn meta(&self, channels: Vec<String>) -> MetaResponse {
        MetaResponse {
            tag_candidates: self.processor.tag_candidates.clone(),
            employment_types: self.processor.employment_types.clone(),
            salary_ranges: self.processor.salary_ranges.clone(),
            role_categories: self.processor.role_categories.clone(),
            language_options: self.processor.language_options.clone(),
            channels,
        }
    }
}
