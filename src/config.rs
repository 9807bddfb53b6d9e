use std::collections::HashMap;
use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::clients::google_calendar::GOOGLE_CALENDAR_API_BASE;
use crate::clients::openai_client::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::error::ConfigError;

/// Raw `KEY=VALUE` pairs from an optional dotenv-style file.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::Malformed {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let mut value = value.trim();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }
            values.insert(key.trim().to_string(), value.to_string());
        }
        Ok(Self { values })
    }

    /// File value first, then the process environment.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| env::var(key).ok())
            .filter(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Bot,
    Cli,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Typed view over `AppConfig`. Credentials stay optional here; each run
/// mode checks what it needs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub run_mode: RunMode,
    pub discord_token: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_base: String,
    pub google_access_token: Option<String>,
    pub google_calendar_api_base: String,
    pub google_calendar_id: String,
    pub timezone: Tz,
    pub request_timeout: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let run_mode = match config.get("RUN_MODE").as_deref() {
            None | Some("cli") => RunMode::Cli,
            Some("bot") => RunMode::Bot,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "RUN_MODE",
                    value: other.to_string(),
                });
            }
        };

        let timezone = match config.get("TIMEZONE") {
            Some(raw) => Tz::from_str(raw.trim()).map_err(|_| ConfigError::Invalid {
                key: "TIMEZONE",
                value: raw,
            })?,
            None => chrono_tz::Asia::Seoul,
        };

        let request_timeout = match config.get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "REQUEST_TIMEOUT_SECS",
                        value: raw,
                    });
                }
            },
            None => Duration::from_secs(10),
        };

        let log_format = match config.get("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            run_mode,
            discord_token: config.get("DISCORD_TOKEN"),
            openai_api_key: config.get("OPENAI_API_KEY"),
            openai_model: config.get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_api_base: config
                .get("OPENAI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            google_access_token: config.get("GOOGLE_ACCESS_TOKEN"),
            google_calendar_api_base: config
                .get("GOOGLE_CALENDAR_API_BASE")
                .unwrap_or_else(|| GOOGLE_CALENDAR_API_BASE.to_string()),
            google_calendar_id: config
                .get("GOOGLE_CALENDAR_ID")
                .unwrap_or_else(|| "primary".to_string()),
            timezone,
            request_timeout,
            log_level: config.get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
        })
    }

    pub fn require(value: &Option<String>, key: &'static str) -> Result<String, ConfigError> {
        value.clone().ok_or(ConfigError::Missing(key))
    }
}
