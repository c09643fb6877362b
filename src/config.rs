//! Runtime configuration.
//!
//! Loaded from a TOML file (default `<config_dir>/feedpulse/config.toml`):
//!
//! ```toml
//! [store]
//! url = "https://clickhouse.example.com:8443"
//! database = "simulator_20250620"
//! user = "analyst"
//! password = "..."
//!
//! [telegram]
//! token = "123456:ABC..."
//! chat_id = "-1001234567890"
//!
//! [report]
//! window_days = 8
//! locale = "ru"
//!
//! [schedule]
//! cron = "0 11 * * *"
//! retries = 2
//! retry_delay_secs = 300
//! ```
//!
//! Secrets can also come from `FEEDPULSE_CLICKHOUSE_PASSWORD`,
//! `FEEDPULSE_TELEGRAM_TOKEN` and `FEEDPULSE_TELEGRAM_CHAT_ID`.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schedule::{DailyTrigger, RetryPolicy};

static RE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

const REDACTED: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub report: ReportSettings,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// ClickHouse connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub feed_table: String,
    pub message_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: "default".to_string(),
            user: "default".to_string(),
            password: String::new(),
            feed_table: "feed_actions".to_string(),
            message_table: "message_actions".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,
    /// Numeric chat id or `@channelname`.
    pub chat_id: String,
}

/// Settings every reporter reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Length of the trailing window ending yesterday, in days.
    pub window_days: u32,
    pub locale: Locale,
    /// Source label for paid (advertising) traffic.
    pub paid_source: String,
    pub organic_source: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            window_days: 8,
            locale: Locale::Ru,
            paid_source: "ads".to_string(),
            organic_source: "organic".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Daily cron expression: `"<minute> <hour> * * *"`.
    pub cron: String,
    pub retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: "0 11 * * *".to_string(),
            retries: 2,
            retry_delay_secs: 300,
        }
    }
}

impl ScheduleConfig {
    pub fn trigger(&self) -> Result<DailyTrigger> {
        DailyTrigger::parse(&self.cron)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

impl Config {
    /// Default config location (`~/.config/feedpulse/config.toml` on Linux).
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("feedpulse").join("config.toml"))
            .ok_or_else(|| Error::Config("cannot determine config directory".into()))
    }

    /// Load, apply env overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            log::warn!("Config file {} not found, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn apply_env_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("FEEDPULSE_CLICKHOUSE_PASSWORD") {
            self.store.password = v;
        }
        if let Some(v) = get("FEEDPULSE_TELEGRAM_TOKEN") {
            self.telegram.token = v;
        }
        if let Some(v) = get("FEEDPULSE_TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.store.url)
            .map_err(|e| Error::Config(format!("invalid store url '{}': {e}", self.store.url)))?;
        for (key, value) in [
            ("store.database", &self.store.database),
            ("store.feed_table", &self.store.feed_table),
            ("store.message_table", &self.store.message_table),
        ] {
            if !RE_IDENT.is_match(value) {
                return Err(Error::Config(format!(
                    "{key} must be a plain identifier, got '{value}'"
                )));
            }
        }
        if self.report.window_days < 2 {
            return Err(Error::Config(format!(
                "report.window_days must be at least 2, got {}",
                self.report.window_days
            )));
        }
        self.schedule.trigger()?;
        Ok(())
    }

    /// Delivery needs both a token and a destination.
    pub fn require_telegram(&self) -> Result<&TelegramConfig> {
        if self.telegram.token.is_empty() {
            return Err(Error::Config(
                "telegram.token is not set (or FEEDPULSE_TELEGRAM_TOKEN)".into(),
            ));
        }
        if self.telegram.chat_id.is_empty() {
            return Err(Error::Config(
                "telegram.chat_id is not set (or FEEDPULSE_TELEGRAM_CHAT_ID)".into(),
            ));
        }
        Ok(&self.telegram)
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.store.password.is_empty() {
            copy.store.password = REDACTED.to_string();
        }
        if !copy.telegram.token.is_empty() {
            copy.telegram.token = REDACTED.to_string();
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
