// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment variable-based configuration provider implementation.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::env;

use super::ConfigError;
use super::ConfigProvider;
use super::typed_value;

/// Configuration provider that retrieves values from environment variables.
///
/// `WAYPOINT_INTERLOK_PROXY_1=/jolokia::http://localhost:8081` becomes the key
/// `interlok.proxy.1`.
#[derive(Debug)]
pub struct EnvConfigProvider {
    prefix: String,
    /// Matching variables, keyed by their dotted configuration key.
    cache: HashMap<String, String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable configuration provider with the specified prefix.
    pub fn new(prefix: &str) -> Self {
        let mut provider = Self {
            prefix: prefix.to_string(),
            cache: HashMap::new(),
        };
        provider.refresh_cache();
        provider
    }

    /// Refresh the cache of environment variables.
    pub fn refresh_cache(&mut self) {
        self.cache.clear();

        for (key, value) in env::vars() {
            if let Some(rest) = key.strip_prefix(&self.prefix) {
                // WAYPOINT_SERVER_PORT -> server.port
                let config_key = rest.to_lowercase().replace('_', ".");
                self.cache.insert(config_key, value);
            }
        }
    }

    fn parse_value_to_json(&self, value: &str) -> Result<Value, ConfigError> {
        Ok(typed_value(value))
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new("WAYPOINT_")
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    fn provider_name(&self) -> &str {
        "env"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        match self.cache.get(key) {
            Some(value) => self.parse_value_to_json(value).map(Some),
            None => Ok(None),
        }
    }

    fn entries(&self, prefix: &str) -> Result<BTreeMap<String, Value>, ConfigError> {
        let mut out = BTreeMap::new();
        for (key, value) in &self.cache {
            if let Some(rest) = key.strip_prefix(prefix).filter(|r| !r.is_empty()) {
                out.insert(rest.to_string(), self.parse_value_to_json(value)?);
            }
        }
        Ok(out)
    }
}
