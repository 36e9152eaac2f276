// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Waypoint configuration subsystem
//!
//! A running tunnel is created from an ordered list of [`ConfigProvider`]s;
//! later providers override earlier ones.  Typical stacking order:
//!
//! 1. `FileConfigProvider` – `waypoint.{toml,json,yaml,properties}`
//! 2. `EnvConfigProvider`  – `WAYPOINT_INTERLOK_PROXY_1=/jolokia::http://…`
//! 3. *your* provider implementing [`ConfigProvider`]
//!
//! | key | type | default | description |
//! |-----|------|---------|-------------|
//! | `interlok.proxy.<n>`     | `"<prefix>::<target>"` | – | One tunnel per entry |
//! | `client.timeout`         | seconds | none | Whole-request timeout for forwarded calls |
//! | `client.connect_timeout` | seconds | none | Connect timeout for forwarded calls |
//! | `server.host`            | string  | `127.0.0.1` | Listener bind host |
//! | `server.port`            | u16     | `8080` | Listener bind port |
//! | `proxy.logging`          | table   | – | See [`crate::logging::config::LoggingConfig`] |

mod env;
pub mod error;
mod file;
mod properties;

#[cfg(test)]
mod tests;

pub use env::EnvConfigProvider;
pub use error::ConfigError;
pub use file::FileConfigProvider;
pub use properties::PropertiesConfigProvider;

use log::trace;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Core configuration provider trait that all configuration sources must implement.
/// This trait is object-safe since it doesn't contain generic methods.
pub trait ConfigProvider: Debug + Send + Sync {
    /// Check if the configuration provider has a value for the given key.
    fn has(&self, key: &str) -> bool;

    /// Get the name of the configuration provider for debugging purposes.
    fn provider_name(&self) -> &str;

    /// Get a raw configuration value by key.
    /// Returns a JSON Value that can be later deserialized into specific types.
    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError>;

    /// Every entry whose key starts with `prefix`, keyed by the remainder of
    /// the key (`interlok.proxy.1` under `interlok.proxy.` yields `1`).
    fn entries(&self, prefix: &str) -> Result<BTreeMap<String, Value>, ConfigError>;
}

/// Extension trait for ConfigProvider that provides methods for typed access.
/// This trait is not object-safe because it has generic methods.
pub trait ConfigProviderExt: ConfigProvider {
    /// Get a configuration value by key and deserialize it to the specified type.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_raw(key)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                ConfigError::ParseError(format!("failed to deserialize '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }
}

impl<T: ConfigProvider> ConfigProviderExt for T {}

/// Builder for the configuration system.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration provider.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Config {
        Config {
            providers: self.providers,
        }
    }
}

/// Main configuration struct that holds all providers and handles retrieving values.
#[derive(Debug, Clone)]
pub struct Config {
    providers: Vec<Arc<dyn ConfigProvider>>,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        // Later providers (higher index) override earlier ones
        for provider in self.providers.iter().rev() {
            if provider.has(key) {
                return provider.get_raw(key);
            }
        }
        Ok(None)
    }

    /// Get a configuration value by key from the highest-priority provider that has it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_raw(key)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                ConfigError::ParseError(format!("failed to deserialize '{key}': {e}"))
            }),
            None => Ok(None),
        }
    }

    /// Collect the entries under `prefix` from every provider.
    ///
    /// Providers are merged in insertion order so a later provider replaces an
    /// earlier provider's value for the same key.
    pub fn entries(&self, prefix: &str) -> Result<BTreeMap<String, Value>, ConfigError> {
        let mut merged = BTreeMap::new();
        for provider in &self.providers {
            merged.extend(provider.entries(prefix)?);
        }
        Ok(merged)
    }

    /// Like [`Config::entries`], reduced to the scalar values.
    ///
    /// Numbers and booleans are turned back into their text form. Nulls,
    /// arrays and tables cannot be a single text value, so those entries are
    /// logged and left out; their siblings are kept.
    pub fn string_entries(&self, prefix: &str) -> Result<BTreeMap<String, String>, ConfigError> {
        Ok(self
            .entries(prefix)?
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                Value::Number(n) => Some((key, n.to_string())),
                Value::Bool(b) => Some((key, b.to_string())),
                other => {
                    trace!("Ignoring '{prefix}{key}': expected a string, found {other}");
                    None
                }
            })
            .collect())
    }

    /// Read a typed section such as `client` or `server`.
    ///
    /// Nested providers answer the section key directly; flat providers
    /// (properties, env) only know `client.timeout` style keys, so those are
    /// gathered and folded back into a table before deserializing.
    pub fn section<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        if let Some(value) = self.get_raw(key)? {
            return serde_json::from_value(value).map(Some).map_err(|e| {
                ConfigError::ParseError(format!("failed to deserialize '{key}': {e}"))
            });
        }

        let flat = self.entries(&format!("{key}."))?;
        if flat.is_empty() {
            return Ok(None);
        }

        let mut table = serde_json::Map::new();
        for (path, value) in flat {
            insert_path(&mut table, &path, value);
        }
        serde_json::from_value(Value::Object(table))
            .map(Some)
            .map_err(|e| ConfigError::ParseError(format!("failed to deserialize '{key}': {e}")))
    }
}

/// Flatten a JSON tree into dot-separated keys.
///
/// Shared by the nested providers so that `{"interlok": {"proxy": {"1": "…"}}}`
/// and a flat `interlok.proxy.1` key look the same to [`ConfigProvider::entries`].
pub(crate) fn flatten_into(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&path, child, out);
            }
        }
        _ => {
            out.insert(prefix.to_string(), value.clone());
        }
    }
}

fn insert_path(table: &mut serde_json::Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            table.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = table
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if !child.is_object() {
                *child = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(inner) = child {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// Interpret a raw text value the way flat sources expect: JSON first, then
/// booleans and numbers, falling back to the text itself.
pub(crate) fn typed_value(value: &str) -> Value {
    if let Ok(json_value) = serde_json::from_str(value) {
        return json_value;
    }
    if value.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int_val) = value.parse::<i64>() {
        return Value::from(int_val);
    }
    if let Ok(float_val) = value.parse::<f64>() {
        return Value::from(float_val);
    }
    Value::String(value.to_string())
}

/// Select the entries of a flat key map that fall under `prefix`.
pub(crate) fn select_prefixed<'a, I>(prefix: &str, flat: I) -> BTreeMap<String, Value>
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    flat.into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (rest.to_string(), value.clone()))
        })
        .collect()
}
