//! Transport configuration.
//!
//! Defaults, a JSON document (what the C ABI hands over), or `WEBREQ_*`
//! environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const ENV_SUCCESS: &str = "WEBREQ_SUCCESS";
const ENV_TIMEOUT_MS: &str = "WEBREQ_TIMEOUT_MS";
const ENV_CONNECT_TIMEOUT_MS: &str = "WEBREQ_CONNECT_TIMEOUT_MS";

/// Which status codes count as a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuccessPolicy {
    /// Every status in `200..=299`.
    #[default]
    #[serde(rename = "any_2xx")]
    Any2xx,
    /// Exactly the listed codes.
    #[serde(rename = "only")]
    Only(Vec<u16>),
}

impl SuccessPolicy {
    /// The pair the engine backend historically accepted.
    pub fn ok_or_created() -> Self {
        SuccessPolicy::Only(vec![200, 201])
    }

    pub fn is_success(&self, status: u16) -> bool {
        match self {
            SuccessPolicy::Any2xx => (200..300).contains(&status),
            SuccessPolicy::Only(codes) => codes.contains(&status),
        }
    }

    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("2xx") || value.eq_ignore_ascii_case("any_2xx") {
            return Some(SuccessPolicy::Any2xx);
        }
        let codes = value
            .split(',')
            .map(|code| code.trim().parse::<u16>())
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        if codes.is_empty() {
            return None;
        }
        Some(SuccessPolicy::Only(codes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    pub success: SuccessPolicy,
    /// Whole-call deadline. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            success: SuccessPolicy::default(),
            timeout_ms: Some(30_000),
            connect_timeout_ms: Some(10_000),
        }
    }
}

impl TransportConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overlaid with any `WEBREQ_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_SUCCESS) {
            config.success = SuccessPolicy::parse(&value).ok_or(ConfigError::Env {
                var: ENV_SUCCESS,
                value,
            })?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            config.timeout_ms = Some(parse_millis(ENV_TIMEOUT_MS, value)?);
        }
        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            config.connect_timeout_ms = Some(parse_millis(ENV_CONNECT_TIMEOUT_MS, value)?);
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_millis(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}
