// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flat `key=value` configuration provider.
//!
//! This is the native shape of tunnel configuration:
//!
//! ```text
//! # one tunnel per line
//! interlok.proxy.1=/jolokia::http://localhost:8081
//! interlok.proxy.2=/alternate::http://my.other.host:8082
//! ```

use serde_json::Value;
use std::collections::BTreeMap;

use super::{ConfigError, ConfigProvider, select_prefixed, typed_value};

/// In-memory provider over flat, dotted keys with string values.
#[derive(Debug, Default, Clone)]
pub struct PropertiesConfigProvider {
    values: BTreeMap<String, Value>,
}

impl PropertiesConfigProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a single property.
    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.values
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Add (or replace) a property with an arbitrary JSON value.
    pub fn with_value(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Parse `key=value` text.
    ///
    /// Blank lines and lines starting with `#` or `!` are ignored. The key ends
    /// at the first `=` (or `:` when no `=` is present), so values may contain
    /// `::` and URLs freely. Keys and values are trimmed; values are typed the
    /// same way environment variables are (`30` is a number, `true` a bool).
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = BTreeMap::new();

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let split_at = line.find('=').or_else(|| line.find(':')).ok_or_else(|| {
                ConfigError::provider_error(
                    "properties",
                    format!("line {}: expected key=value", index + 1),
                )
            })?;

            let key = line[..split_at].trim();
            if key.is_empty() {
                return Err(ConfigError::provider_error(
                    "properties",
                    format!("line {}: empty key", index + 1),
                ));
            }
            let value = line[split_at + 1..].trim();
            values.insert(key.to_string(), typed_value(value));
        }

        Ok(Self { values })
    }

    /// Number of properties held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the provider holds no properties.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigProvider for PropertiesConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn provider_name(&self) -> &str {
        "properties"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }

    fn entries(&self, prefix: &str) -> Result<BTreeMap<String, Value>, ConfigError> {
        Ok(select_prefixed(prefix, &self.values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigProviderExt;

    #[test]
    fn test_parse_properties_text() {
        let provider = PropertiesConfigProvider::parse(
            "# tunnels\n\
             interlok.proxy.1=/jolokia::http://localhost:8081\n\
             \n\
             ! legacy comment\n\
             interlok.proxy.2 = /alternate::http://my.other.host:8082\n\
             client.timeout=30\n",
        )
        .unwrap();

        assert_eq!(provider.len(), 3);
        let first: String = provider.get("interlok.proxy.1").unwrap().unwrap();
        assert_eq!(first, "/jolokia::http://localhost:8081");
        let second: String = provider.get("interlok.proxy.2").unwrap().unwrap();
        assert_eq!(second, "/alternate::http://my.other.host:8082");
    }

    #[test]
    fn test_colon_separator_when_no_equals() {
        let provider = PropertiesConfigProvider::parse("server.host: 0.0.0.0").unwrap();
        let host: String = provider.get("server.host").unwrap().unwrap();
        assert_eq!(host, "0.0.0.0");
    }

    #[test]
    fn test_parse_rejects_line_without_separator() {
        let err = PropertiesConfigProvider::parse("interlok.proxy.1").unwrap_err();
        assert!(err.to_string().contains("line 1"));

        let err = PropertiesConfigProvider::parse("ok=1\n=value").unwrap_err();
        assert!(err.to_string().contains("line 2: empty key"));
    }

    #[test]
    fn test_entries_strip_prefix() {
        let provider = PropertiesConfigProvider::new()
            .with_property("interlok.proxy.1", "/a::http://a")
            .with_property("interlok.proxy.b", "/b::http://b")
            .with_property("interlok.proxy.", "ignored")
            .with_property("interlok.other", "nope");

        let entries = provider.entries("interlok.proxy.").unwrap();
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["1", "b"]);
    }
}
