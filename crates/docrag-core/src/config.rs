//! Helpers for reading configuration from the environment
//!
//! Each `*Config` is built by a `from_lookup` constructor that takes one of
//! these lookup functions, so configuration parsing can be tested without
//! touching the process environment. `ServiceConfig::from_env` passes
//! [`env_lookup`].

use std::fmt::Display;
use std::str::FromStr;

use crate::{Error, Result};

/// Source of configuration values, keyed by variable name
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup backed by the process environment
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Read an optional value; blank values count as unset
pub fn optional(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read a value that must be present
pub fn required(lookup: Lookup<'_>, key: &str) -> Result<String> {
    optional(lookup, key).ok_or_else(|| {
        Error::Configuration(format!("{} environment variable not found", key))
    })
}

/// Read and parse a value, falling back to `default` when unset
pub fn parsed_or<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match optional(lookup, key) {
        Some(raw) => raw.parse::<T>().map_err(|e| {
            Error::Configuration(format!("invalid value {:?} for {}: {}", raw, key, e))
        }),
        None => Ok(default),
    }
}
