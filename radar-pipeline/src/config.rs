//! Pipeline configuration
//!
//! Defines the tunables of every pipeline stage: crawl window and sources,
//! classifier prompt and candidate lists, cycle cadence and mail delivery.
//! Each struct deserializes from a partial TOML table, falling back to the
//! defaults for missing keys. Out-of-range values are normalized by the
//! accessor methods rather than rejected.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CATEGORY_PATHS: [&str; 2] = ["/categories/5?sort=new", "/categories/22?sort=new"];
pub const DEFAULT_REMOTE_MARKERS: [&str; 2] = ["远程", "remote"];

// =============================================================================
// Crawl
// =============================================================================

/// Crawl engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Listing site root (e.g., "https://eleduck.com")
    pub base_url: String,

    /// Source name stored on every candidate
    pub source: String,

    /// Posts published before `now - max_age_days` end a category
    pub max_age_days: i64,

    /// Maximum number of pages visited per category
    pub max_pages: i64,

    /// Category listing paths, resolved against `base_url`
    pub category_paths: Vec<String>,

    /// A post is remote when one of its tags contains one of these markers
    pub remote_markers: Vec<String>,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl CrawlConfig {
    pub fn max_age_days(&self) -> i64 {
        if self.max_age_days <= 0 { 30 } else { self.max_age_days }
    }

    pub fn max_pages(&self) -> i64 {
        if self.max_pages <= 0 { 1 } else { self.max_pages }
    }

    /// Category paths with blanks dropped, or the defaults when none remain
    pub fn category_paths(&self) -> Vec<String> {
        let paths = non_blank(&self.category_paths);
        if paths.is_empty() {
            DEFAULT_CATEGORY_PATHS.iter().map(|p| p.to_string()).collect()
        } else {
            paths
        }
    }

    /// Lower-cased remote markers, or the defaults when none are set
    pub fn remote_markers(&self) -> Vec<String> {
        let markers: Vec<String> = non_blank(&self.remote_markers)
            .into_iter()
            .map(|marker| marker.to_lowercase())
            .collect();
        if markers.is_empty() {
            DEFAULT_REMOTE_MARKERS.iter().map(|m| m.to_string()).collect()
        } else {
            markers
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://eleduck.com".to_string(),
            source: "eleduck".to_string(),
            max_age_days: 30,
            max_pages: 1,
            category_paths: DEFAULT_CATEGORY_PATHS.iter().map(|p| p.to_string()).collect(),
            remote_markers: DEFAULT_REMOTE_MARKERS.iter().map(|m| m.to_string()).collect(),
            timeout_secs: 15,
        }
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Classifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// At least one must occur in the posting text; empty accepts everything
    pub keywords: Vec<String>,

    /// Prompt with `{{TEXT}}` and `{{TAGS}}` placeholders; blank uses the built-in one
    pub prompt_template: String,

    /// Whitelist for normalized tags
    pub tag_candidates: Vec<String>,
    pub employment_types: Vec<String>,
    pub salary_ranges: Vec<String>,
    pub role_categories: Vec<String>,
    pub language_options: Vec<String>,

    /// Pending raw jobs classified per cycle
    pub batch_size: i64,
}

impl ProcessorConfig {
    pub fn batch_size(&self) -> i64 {
        if self.batch_size <= 0 { 20 } else { self.batch_size }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fixed interval (e.g., "2h", "1h30m") or a five-field cron expression
    pub interval: String,

    /// Per-cycle deadline (e.g., "30s")
    pub timeout: String,
}

impl SchedulerConfig {
    /// Parsed cycle deadline, 30 seconds when missing or invalid
    pub fn cycle_timeout(&self) -> Duration {
        parse_duration(&self.timeout).unwrap_or(Duration::from_secs(30))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: "2h".to_string(),
            timeout: "30s".to_string(),
        }
    }
}

/// Parses a positive human-readable duration
pub fn parse_duration(value: &str) -> Option<Duration> {
    humantime::parse_duration(value.trim())
        .ok()
        .filter(|duration| !duration.is_zero())
}

// =============================================================================
// Email
// =============================================================================

/// Outgoing mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub from: String,
    /// Default recipients; subscription delivery replaces them
    pub to: Vec<String>,
    pub subject: String,
    pub starttls: bool,
}

impl EmailConfig {
    /// Whether enough is set to reach an SMTP server
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty() && !self.from.trim().is_empty()
    }

    /// Default recipients, blanks dropped
    pub fn recipients(&self) -> Vec<String> {
        non_blank(&self.to)
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: Vec::new(),
            subject: String::new(),
            starttls: true,
        }
    }
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
