use anyhow::{bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

use reminder_core::{DEFAULT_THRESHOLDS_MINS, THRESHOLD_CATCH_WINDOW_SECS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IANA timezone used for all reminder arithmetic (e.g. "Asia/Kolkata")
    pub timezone: String,

    /// How often to run a reminder check (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// How far behind "now" each fetch window reaches (minutes)
    #[serde(default = "default_lookbehind")]
    pub fetch_lookbehind_mins: i64,

    /// How far ahead of "now" each fetch window reaches (minutes)
    #[serde(default = "default_lookahead")]
    pub fetch_lookahead_mins: i64,

    /// Maximum events fetched per check
    #[serde(default = "default_max_results")]
    pub max_results: i32,

    /// Lead times before an event start at which to remind (minutes)
    #[serde(default = "default_thresholds")]
    pub reminder_thresholds_mins: Vec<i64>,

    /// Drop dedup entries not observed for this many hours; 0 disables
    /// eviction and the table grows for the process lifetime
    #[serde(default = "default_retention_hours")]
    pub state_retention_hours: u64,

    /// Google Calendar access
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Path to Google OAuth client credentials JSON file
    pub credentials_path: String,

    /// Path to store the OAuth token cache
    #[serde(default = "default_token_cache")]
    pub token_cache_path: String,

    /// Calendar to poll for events
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_lookbehind() -> i64 {
    5
}

fn default_lookahead() -> i64 {
    60
}

fn default_max_results() -> i32 {
    20
}

fn default_thresholds() -> Vec<i64> {
    DEFAULT_THRESHOLDS_MINS.to_vec()
}

fn default_retention_hours() -> u64 {
    24
}

fn default_token_cache() -> String {
    "calendar_token_cache.json".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid timezone: {}", self.timezone))
    }

    /// Reject settings the reminder engine cannot honor. The poll interval
    /// must fit inside the threshold catch window, or crossings fall
    /// between two polls and their reminders are skipped.
    pub fn validate(&self) -> Result<()> {
        self.timezone()?;

        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be positive");
        }
        if self.poll_interval_secs as i64 > THRESHOLD_CATCH_WINDOW_SECS {
            bail!(
                "poll_interval_secs must not exceed the {}s threshold catch window",
                THRESHOLD_CATCH_WINDOW_SECS
            );
        }

        if self.reminder_thresholds_mins.is_empty() {
            bail!("reminder_thresholds_mins must name at least one lead time");
        }
        if self.reminder_thresholds_mins.iter().any(|&m| m <= 0) {
            bail!("reminder_thresholds_mins must all be positive");
        }
        if let Some(&largest) = self.reminder_thresholds_mins.iter().max() {
            if self.fetch_lookahead_mins <= largest {
                bail!(
                    "fetch_lookahead_mins ({}) must exceed the largest reminder threshold ({})",
                    self.fetch_lookahead_mins,
                    largest
                );
            }
        }

        if self.fetch_lookbehind_mins < 0 {
            bail!("fetch_lookbehind_mins must not be negative");
        }
        if self.max_results <= 0 {
            bail!("max_results must be positive");
        }

        Ok(())
    }

    pub fn example() -> Self {
        Config {
            timezone: "Asia/Kolkata".to_string(),
            poll_interval_secs: default_poll_interval(),
            fetch_lookbehind_mins: default_lookbehind(),
            fetch_lookahead_mins: default_lookahead(),
            max_results: default_max_results(),
            reminder_thresholds_mins: default_thresholds(),
            state_retention_hours: default_retention_hours(),
            calendar: CalendarConfig {
                credentials_path: "credentials.json".to_string(),
                token_cache_path: default_token_cache(),
                calendar_id: default_calendar_id(),
            },
        }
    }
}
