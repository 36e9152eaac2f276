// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the configuration module.

use std::fmt;
use std::io;
use thiserror::Error;

/// Errors that can occur while reading configuration.
///
/// A single malformed tunnel entry is *not* an error (it is skipped by the
/// route table); these variants describe configuration that cannot be read
/// or has the wrong shape altogether.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The requested configuration key was not found.
    #[error("configuration key not found")]
    NotFound,

    /// An error occurred while parsing or deserializing a configuration value.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// An IO error occurred (e.g., while reading a configuration file).
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// An error related to a specific configuration provider.
    #[error("provider error: {provider}: {message}")]
    ProviderError { provider: String, message: String },

    /// A generic error.
    #[error("{0}")]
    Other(String),
}

impl ConfigError {
    /// Create a new provider error.
    pub fn provider_error<P: fmt::Display, M: fmt::Display>(provider: P, message: M) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_parse_error_display() {
        let error = ConfigError::ParseError("expected a string for 'interlok.proxy.1'".to_string());
        assert_eq!(
            error.to_string(),
            "failed to parse configuration: expected a string for 'interlok.proxy.1'"
        );
    }

    #[test]
    fn test_io_error_conversion_keeps_source() {
        let error: ConfigError = IoError::new(ErrorKind::NotFound, "waypoint.toml").into();

        assert!(matches!(error, ConfigError::IoError(ref e) if e.kind() == ErrorKind::NotFound));
        assert_eq!(error.source().unwrap().to_string(), "waypoint.toml");
    }

    #[test]
    fn test_provider_error_constructor() {
        let error = ConfigError::provider_error("properties", "line 3: missing '='");

        match &error {
            ConfigError::ProviderError { provider, message } => {
                assert_eq!(provider, "properties");
                assert_eq!(message, "line 3: missing '='");
            }
            _ => panic!("Expected ProviderError variant"),
        }
        assert_eq!(
            error.to_string(),
            "provider error: properties: line 3: missing '='"
        );
    }

    #[test]
    fn test_variants_without_source() {
        assert!(ConfigError::NotFound.source().is_none());
        assert!(ConfigError::Other("x".into()).source().is_none());
        assert_eq!(ConfigError::NotFound.to_string(), "configuration key not found");
    }
}
