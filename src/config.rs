//! Validator configuration.
//!
//! Three sources are supported: JSON, Java-style properties text, and the
//! process environment. A missing alias is not a load error; it surfaces as
//! `PropertyUnavailable` on every validation. A missing, negative or
//! unparsable time window falls back to [`DEFAULT_TIME_WINDOW_SECONDS`].

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};

use crate::error::ConfigError;

pub const DEFAULT_TIME_WINDOW_SECONDS: u64 = 300;

pub const ALIAS_PROPERTY: &str = "vaultseal.jwt.alias";
pub const TIME_WINDOW_PROPERTY: &str = "vaultseal.jwt.time.window";
pub const ALIAS_ENV: &str = "VAULTSEAL_JWT_ALIAS";
pub const TIME_WINDOW_ENV: &str = "VAULTSEAL_JWT_TIME_WINDOW";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Vault entry naming the shared secret.
    #[serde(default)]
    pub alias: Option<String>,
    /// Maximum `exp - nbf` width, and the replay cleanup horizon.
    #[serde(
        default = "default_time_window",
        deserialize_with = "lenient_time_window"
    )]
    pub time_window_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alias: None,
            time_window_seconds: DEFAULT_TIME_WINDOW_SECONDS,
        }
    }
}

impl Config {
    pub fn new(alias: impl Into<String>, time_window_seconds: u64) -> Self {
        Self {
            alias: Some(alias.into()),
            time_window_seconds,
        }
    }

    /// Parse `{"alias": "...", "timeWindowSeconds": 300}`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Parse `key=value` lines. `#` and `!` start comments; `:` is accepted
    /// as a separator; unknown keys are ignored.
    pub fn from_properties(text: &str) -> Self {
        let mut alias = None;
        let mut time_window = None;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once(['=', ':']) else {
                continue;
            };
            match key.trim() {
                ALIAS_PROPERTY => alias = Some(value.trim().to_string()),
                TIME_WINDOW_PROPERTY => time_window = Some(value.trim().to_string()),
                _ => {}
            }
        }
        Config {
            alias,
            time_window_seconds: parse_time_window(time_window.as_deref()),
        }
        .normalized()
    }

    pub fn from_env() -> Self {
        let alias = std::env::var(ALIAS_ENV).ok();
        let time_window = std::env::var(TIME_WINDOW_ENV).ok();
        Config {
            alias,
            time_window_seconds: parse_time_window(time_window.as_deref()),
        }
        .normalized()
    }

    /// Time window in seconds, saturated into the timestamp domain.
    pub fn time_window(&self) -> i64 {
        i64::try_from(self.time_window_seconds).unwrap_or(i64::MAX)
    }

    fn normalized(mut self) -> Self {
        if self.alias.as_deref().is_some_and(|a| a.trim().is_empty()) {
            self.alias = None;
        }
        if self.alias.is_none() {
            error!(property = ALIAS_PROPERTY, "vault alias is not configured");
        }
        self
    }
}

fn default_time_window() -> u64 {
    DEFAULT_TIME_WINDOW_SECONDS
}

fn parse_time_window(raw: Option<&str>) -> u64 {
    match raw.map(str::trim) {
        Some(value) => match value.parse::<u64>() {
            Ok(seconds) => seconds,
            Err(_) => {
                info!(value, default = DEFAULT_TIME_WINDOW_SECONDS, "unusable time window, using default");
                DEFAULT_TIME_WINDOW_SECONDS
            }
        },
        None => {
            info!(default = DEFAULT_TIME_WINDOW_SECONDS, "time window not set, using default");
            DEFAULT_TIME_WINDOW_SECONDS
        }
    }
}

/// Accept a non-negative integer or a numeric string; anything else
/// (negative, fractional, garbage, null) becomes the default.
fn lenient_time_window<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(seconds) => seconds,
            None => parse_time_window(Some(&n.to_string())),
        },
        serde_json::Value::String(s) => parse_time_window(Some(&s)),
        _ => parse_time_window(None),
    })
}
