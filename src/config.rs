//! Environment-driven configuration and the startup validation gate.
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::fmt;
use thiserror::Error;

pub const LINE_CHANNEL_ACCESS_TOKEN: &str = "LINE_CHANNEL_ACCESS_TOKEN";
pub const LINE_CHANNEL_SECRET: &str = "LINE_CHANNEL_SECRET";
pub const LINE_USER_IDS: &str = "LINE_USER_IDS";
/// Single-recipient spelling accepted when `LINE_USER_IDS` is unset.
pub const LINE_USER_ID: &str = "LINE_USER_ID";
pub const UPSTASH_REDIS_REST_URL: &str = "UPSTASH_REDIS_REST_URL";
pub const UPSTASH_REDIS_REST_TOKEN: &str = "UPSTASH_REDIS_REST_TOKEN";

/// Required settings, in the order they are reported when missing.
pub const REQUIRED_VARS: [&str; 5] = [
    LINE_CHANNEL_ACCESS_TOKEN,
    LINE_CHANNEL_SECRET,
    LINE_USER_IDS,
    UPSTASH_REDIS_REST_URL,
    UPSTASH_REDIS_REST_TOKEN,
];

static RECIPIENT_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;\s]+").expect("valid recipient separator regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", describe_missing(.0))]
    Missing(Vec<&'static str>),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Validated process configuration. Fixed for the process lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub line: Line,
    pub upstash: Upstash,
}

/// Messaging API credentials and the recipient list.
#[derive(Clone, PartialEq, Eq)]
pub struct Line {
    pub channel_access_token: String,
    pub channel_secret: String,
    pub recipients: Vec<String>,
}

/// Day ledger endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Upstash {
    pub rest_url: Url,
    pub rest_token: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("recipients", &self.line.recipients.len())
            .field("ledger_url", &self.upstash.rest_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing = missing_vars(&lookup);
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let value = |name: &str| non_empty(&lookup, name).unwrap_or_default();
        let raw_url = value(UPSTASH_REDIS_REST_URL);
        let rest_url = Url::parse(raw_url.trim())
            .map_err(|e| ConfigError::Invalid(format!("{UPSTASH_REDIS_REST_URL}: {e}")))?;

        let recipients = parse_recipients(&recipient_source(&lookup).unwrap_or_default());
        if recipients.is_empty() {
            return Err(ConfigError::Missing(vec![LINE_USER_IDS]));
        }

        Ok(Self {
            line: Line {
                channel_access_token: value(LINE_CHANNEL_ACCESS_TOKEN),
                channel_secret: value(LINE_CHANNEL_SECRET),
                recipients,
            },
            upstash: Upstash {
                rest_url,
                rest_token: value(UPSTASH_REDIS_REST_TOKEN),
            },
        })
    }
}

/// Names of every required setting that is absent or blank.
pub fn missing_vars<F>(lookup: F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    REQUIRED_VARS
        .iter()
        .copied()
        .filter(|name| {
            if *name == LINE_USER_IDS {
                recipient_source(&lookup).is_none()
            } else {
                non_empty(&lookup, name).is_none()
            }
        })
        .collect()
}

fn describe_missing(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| {
            if *name == LINE_USER_IDS {
                format!("{LINE_USER_IDS} (or {LINE_USER_ID})")
            } else {
                name.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split a recipient list on commas, semicolons or whitespace, dropping
/// blanks and repeated ids while keeping first-seen order.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in RECIPIENT_SEPARATOR.split(raw) {
        if id.is_empty() || out.iter().any(|seen| seen == id) {
            continue;
        }
        out.push(id.to_string());
    }
    out
}

fn recipient_source<F>(lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, LINE_USER_IDS).or_else(|| non_empty(lookup, LINE_USER_ID))
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}
