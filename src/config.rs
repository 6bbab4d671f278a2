//! Configuration for the broadcaster bot
//!
//! Loads configuration from config.yml file

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const DATA_FILE: &str = "bot_data.json";
pub const MAX_CHANNELS_PER_USER: usize = 10;
pub const SCHEDULER_CHECK_INTERVAL_SECS: u64 = 30;
pub const MAX_SEND_ATTEMPTS: u32 = 1;

/// Accepted schedule-time input formats, tried in order.
pub const TIME_FORMATS: [&str; 5] = [
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    telegram: Option<TelegramConfig>,
    storage: Option<StorageConfig>,
    limits: Option<LimitsConfig>,
    scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Deserialize)]
struct TelegramConfig {
    bot_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageConfig {
    data_file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LimitsConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    max_channels_per_user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SchedulerConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    check_interval_secs: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    max_send_attempts: Option<String>,
    time_formats: Option<Vec<String>>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub data_file: String,
    pub max_channels_per_user: usize,
    pub check_interval: Duration,
    pub max_send_attempts: u32,
    pub time_formats: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        // If value from YAML looks like ${...}, try env var
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                // Extract var name from ${VAR_NAME}
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            }
        }
        // Also check explicit env_key as fallback
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        value.unwrap_or_default()
    }

    /// Resolve a u64 value from string config or env var
    fn resolve_env_u64(value: Option<String>, env_key: &str, default: u64) -> u64 {
        // If value from YAML looks like ${...}, try env var
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    if let Ok(parsed) = env_val.parse::<u64>() {
                        return parsed;
                    }
                }
            }
            // Try parsing directly if it's a number
            if let Ok(parsed) = v.parse::<u64>() {
                return parsed;
            }
        }
        // Fallback: check explicit env_key
        if let Ok(env_val) = std::env::var(env_key) {
            if let Ok(parsed) = env_val.parse::<u64>() {
                return parsed;
            }
        }
        default
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Load .env file first
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)?;

        let telegram = yaml.telegram.unwrap_or(TelegramConfig { bot_token: None });
        let storage = yaml.storage.unwrap_or(StorageConfig { data_file: None });
        let limits = yaml.limits.unwrap_or(LimitsConfig {
            max_channels_per_user: None,
        });
        let scheduler = yaml.scheduler.unwrap_or(SchedulerConfig {
            check_interval_secs: None,
            max_send_attempts: None,
            time_formats: None,
        });

        // Resolve values with env var precedence
        let bot_token = Self::resolve_env_string(telegram.bot_token, "BOT_TOKEN");
        let data_file = {
            let resolved = Self::resolve_env_string(storage.data_file, "BROADCASTER_DATA_FILE");
            if resolved.is_empty() {
                DATA_FILE.to_string()
            } else {
                resolved
            }
        };
        let max_channels_per_user = Self::resolve_env_u64(
            limits.max_channels_per_user,
            "MAX_CHANNELS_PER_USER",
            MAX_CHANNELS_PER_USER as u64,
        ) as usize;
        let check_interval_secs = Self::resolve_env_u64(
            scheduler.check_interval_secs,
            "SCHEDULER_CHECK_INTERVAL",
            SCHEDULER_CHECK_INTERVAL_SECS,
        );
        let max_send_attempts = Self::resolve_env_u64(
            scheduler.max_send_attempts,
            "MAX_SEND_ATTEMPTS",
            MAX_SEND_ATTEMPTS as u64,
        ) as u32;

        Ok(Self {
            bot_token,
            data_file,
            max_channels_per_user,
            check_interval: Duration::from_secs(check_interval_secs.max(1)),
            max_send_attempts: max_send_attempts.max(1),
            time_formats: scheduler
                .time_formats
                .unwrap_or_else(|| TIME_FORMATS.iter().map(|f| f.to_string()).collect()),
        })
    }

    /// Create config with empty defaults (fallback)
    /// User MUST provide the bot token via config.yml or BOT_TOKEN
    pub fn defaults() -> Self {
        Self::load_dotenv();
        Self {
            bot_token: std::env::var("BOT_TOKEN").unwrap_or_default(),
            data_file: DATA_FILE.to_string(),
            max_channels_per_user: MAX_CHANNELS_PER_USER,
            check_interval: Duration::from_secs(SCHEDULER_CHECK_INTERVAL_SECS),
            max_send_attempts: MAX_SEND_ATTEMPTS,
            time_formats: TIME_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}
