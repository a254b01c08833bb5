//! Runtime configuration, resolved from the process environment once at
//! startup. No other module reads environment variables for the
//! notification pipeline.

use std::env;
use thiserror::Error;

pub const ENV_ZOOM_CLIENT_ID: &str = "ZOOM_CLIENT_ID";
pub const ENV_ZOOM_CLIENT_SECRET: &str = "ZOOM_CLIENT_SECRET";
pub const ENV_ZOOM_ACCOUNT_ID: &str = "ZOOM_ACCOUNT_ID";
pub const ENV_SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
pub const ENV_SLACK_CHANNEL: &str = "SLACK_CHANNEL";
pub const ENV_UTC_OFFSET_HOURS: &str = "MEETBRIEF_UTC_OFFSET_HOURS";
pub const ENV_PAGE_SIZE: &str = "MEETBRIEF_PAGE_SIZE";
pub const ENV_ZOOM_API_BASE_URL: &str = "ZOOM_API_BASE_URL";
pub const ENV_ZOOM_OAUTH_BASE_URL: &str = "ZOOM_OAUTH_BASE_URL";

const DEFAULT_CHANNEL: &str = "#general";
const DEFAULT_UTC_OFFSET_HOURS: i64 = 9;
const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_API_BASE_URL: &str = "https://api.zoom.us";
const DEFAULT_OAUTH_BASE_URL: &str = "https://zoom.us";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Immutable settings for one run, built once and passed down by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub zoom_client_id: String,
    pub zoom_client_secret: String,
    pub zoom_account_id: String,
    pub slack_webhook_url: String,
    pub slack_channel: String,
    /// Fixed offset applied to UTC start times when rendering the briefing.
    pub utc_offset_hours: i64,
    /// Single-page fetch ceiling for the meeting list. No pagination cursor
    /// is followed beyond this.
    pub page_size: u32,
    pub zoom_api_base_url: String,
    pub zoom_oauth_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from an arbitrary lookup function so tests can
    /// supply values without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |name: &'static str| match lookup(name) {
            Some(value) if !value.is_empty() => value,
            _ => {
                missing.push(name.to_string());
                String::new()
            }
        };

        let zoom_client_id = required(ENV_ZOOM_CLIENT_ID);
        let zoom_client_secret = required(ENV_ZOOM_CLIENT_SECRET);
        let zoom_account_id = required(ENV_ZOOM_ACCOUNT_ID);
        let slack_webhook_url = required(ENV_SLACK_WEBHOOK_URL);

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let slack_channel = lookup(ENV_SLACK_CHANNEL)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        let utc_offset_hours =
            parse_optional(&lookup, ENV_UTC_OFFSET_HOURS, DEFAULT_UTC_OFFSET_HOURS)?;
        let page_size = parse_optional(&lookup, ENV_PAGE_SIZE, DEFAULT_PAGE_SIZE)?;
        let zoom_api_base_url = lookup(ENV_ZOOM_API_BASE_URL)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let zoom_oauth_base_url = lookup(ENV_ZOOM_OAUTH_BASE_URL)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_OAUTH_BASE_URL.to_string());

        Ok(Self {
            zoom_client_id,
            zoom_client_secret,
            zoom_account_id,
            slack_webhook_url,
            slack_channel,
            utc_offset_hours,
            page_size,
            zoom_api_base_url,
            zoom_oauth_base_url,
        })
    }
}

fn parse_optional<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        _ => Ok(default),
    }
}
