//! HabitBell configuration system.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HabitBellError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitBellConfig {
    /// UTC offset users enter habit times in, e.g. `+03:00`.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_timezone() -> String { "+03:00".into() }

impl Default for HabitBellConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            database: DatabaseConfig::default(),
            telegram: TelegramConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl HabitBellConfig {
    /// Load config from the default path (~/.habitbell/config.toml), then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HabitBellError::Config(format!("Failed to read config: {e}")))?;
        let config = Self::parse(&content)?;
        tracing::debug!("⚙️ Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML config content.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| HabitBellError::Config(format!("Failed to parse config: {e}")))?;
        config.utc_offset()?;
        Ok(config)
    }

    /// Override values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override values from a key lookup; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(tz) = get("HABITBELL_TIMEZONE") {
            self.timezone = tz;
        }
        if let Some(db) = get("HABITBELL_DB") {
            self.database.path = db;
        }
    }

    /// Save config to a path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| HabitBellError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the HabitBell home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".habitbell")
    }

    /// The configured local time zone as a fixed UTC offset.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.timezone)
    }

    /// Database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).to_string())
    }
}

/// Parse `UTC`, `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`.
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s == "Z" {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| HabitBellError::Config("invalid UTC offset".into()));
    }

    let bad = || HabitBellError::Config(format!("Invalid timezone offset '{s}', expected e.g. +03:00"));
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(bad()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| bad())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| bad())?;
    if hours > 23 || minutes > 59 {
        return Err(bad());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.habitbell/habitbell.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; reminders are not delivered while it is empty.
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// HTTP request timeout.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn bool_true() -> bool { true }
fn default_api_base() -> String { "https://api.telegram.org".into() }
fn default_request_timeout() -> u64 { 10 }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            enabled: true,
            api_base: default_api_base(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl TelegramConfig {
    /// Whether delivery can be attempted at all.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.bot_token.trim().is_empty()
    }
}

/// Reminder loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Upper bound for a single delivery; expiry counts as a failed send.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
}

fn default_check_interval() -> u64 { 60 }
fn default_send_timeout() -> u64 { 10 }
fn default_max_concurrent_sends() -> usize { 8 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            send_timeout_secs: default_send_timeout(),
            max_concurrent_sends: default_max_concurrent_sends(),
        }
    }
}
