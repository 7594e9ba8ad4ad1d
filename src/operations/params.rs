//! Query parameter parsing shared by every operation.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// A request that cannot be served. Reported as an HTTP error before upgrading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("bucket name is required")]
    MissingBucket,

    #[error("invalid bucket name '{0}'")]
    InvalidBucket(String),

    #[error("missing required parameter '{0}'")]
    Missing(&'static str),

    #[error("invalid value '{value}' for '{name}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("force-start and force-stop are mutually exclusive")]
    ConflictingForce,
}

impl RequestError {
    pub(crate) fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> Self {
        RequestError::Invalid {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Decoded query string. Repeated keys keep their first value; empty values
/// count as absent.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Value or the empty string.
    pub fn string(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    /// Strict boolean; absent means `false`.
    pub fn flag(&self, name: &'static str) -> Result<bool, RequestError> {
        match self.get(name) {
            None => Ok(false),
            Some(raw) => parse_bool(raw).ok_or_else(|| RequestError::invalid(name, raw, "expected a boolean")),
        }
    }

    pub fn duration(&self, name: &'static str) -> Result<Option<Duration>, RequestError> {
        self.get(name)
            .map(|raw| humantime::parse_duration(raw).map_err(|e| RequestError::invalid(name, raw, e.to_string())))
            .transpose()
    }

    pub fn number<T>(&self, name: &'static str) -> Result<Option<T>, RequestError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|raw| raw.parse::<T>().map_err(|e| RequestError::invalid(name, raw, e.to_string())))
            .transpose()
    }

    /// Comma-separated list with empty items removed.
    pub fn list(&self, name: &str) -> Vec<&str> {
        self.get(name)
            .map(|raw| raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// The literal set accepted for boolean parameters.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
