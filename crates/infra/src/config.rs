//! Configuration source handed to modules at registration time.
//!
//! Keys are dotted, lowercase paths (`communities.max_members`). The process
//! environment maps onto them by prefix: `AGORA_COMMUNITIES__MAX_MEMBERS=50`
//! becomes `communities.max_members = "50"`.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// Environment variable prefix recognised by [`Configuration::from_env`].
pub const ENV_PREFIX: &str = "AGORA_";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration key `{key}`")]
    Missing { key: String },

    #[error("invalid value `{value}` for configuration key `{key}`: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Immutable key/value configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every `AGORA_*` variable from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build from `(name, value)` pairs shaped like environment variables.
    /// Names without the [`ENV_PREFIX`] are ignored.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let values = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(ENV_PREFIX)?;
                if key.is_empty() {
                    return None;
                }
                Some((key.to_ascii_lowercase().replace("__", "."), value))
            })
            .collect();
        Self { values }
    }

    /// Build from already-dotted keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
    }

    /// Parse a key if present. Absent keys are `Ok(None)`; malformed values are errors.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn get_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.get_parsed(key)?.unwrap_or(default))
    }

    /// Keys under `prefix.`, with the prefix stripped.
    pub fn section(&self, prefix: &str) -> Configuration {
        let lead = format!("{prefix}.");
        Self {
            values: self
                .values
                .iter()
                .filter_map(|(k, v)| k.strip_prefix(&lead).map(|rest| (rest.to_string(), v.clone())))
                .collect(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
