// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core primitives – errors, methods & routes.
//!
//! Everything the forwarding engine, the listener and the manager agree on
//! is defined here.  No IO happens in this module; forwarding lives in
//! `proxy`, sockets in `server`.


use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Configuration prefix under which tunnel entries live.
pub const PROXY_PREFIX: &str = "interlok.proxy.";

/// Separator between the path prefix and the target base URL of an entry.
pub const SEPARATOR: &str = "::";

/// Content type used when a backend omits one, and for synthesized failures.
pub const CONTENT_TYPE_DEFAULT: &str = "text/plain";

/// Errors that can occur during proxy operations.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The inbound method has no outbound counterpart.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// A piece of request metadata the listener should have set is absent.
    #[error("missing request metadata: {0}")]
    MissingMetadata(&'static str),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    ClientError(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A route could not be (de)registered with the inbound connection.
    #[error("registration error: {0}")]
    Registration(String),

    /// The response could not be relayed back to the caller.
    #[error("relay error: {0}")]
    Relay(String),

    /// An operation was invoked in the wrong lifecycle state.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Several independent failures, e.g. while stopping every route.
    #[error("{} failure(s): {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<ProxyError>),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn join_errors(errors: &[ProxyError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<crate::config::error::ConfigError> for ProxyError {
    fn from(err: crate::config::error::ConfigError) -> Self {
        ProxyError::ConfigError(err.to_string())
    }
}

/// HTTP methods the tunnel forwards.
///
/// `CONNECT` is deliberately absent: a tunnel endpoint is not a forward proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Every supported method, in no particular order of preference.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| ProxyError::UnsupportedMethod(s.to_string()))
    }
}

impl TryFrom<&reqwest::Method> for HttpMethod {
    type Error = ProxyError;

    fn try_from(method: &reqwest::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}

/// A fixed binding between one inbound path prefix and one target base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// The configuration key this route was built from (for logging)
    pub id: String,
    /// The inbound path prefix, as configured
    pub path_prefix: String,
    /// The base URL requests are forwarded to
    pub target_base_url: String,
}

impl Route {
    pub fn new(
        id: impl Into<String>,
        path_prefix: impl Into<String>,
        target_base_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path_prefix: path_prefix.into(),
            target_base_url: target_base_url.into(),
        }
    }

    /// The pattern registered with the listener: the prefix with a `/*`
    /// suffix, added only when not already present.
    pub fn registration_pattern(&self) -> String {
        wildcard(&self.path_prefix)
    }
}

/// Append `/*` to a path unless it already ends with it.
pub fn wildcard(path: &str) -> String {
    if path.ends_with("/*") {
        path.to_string()
    } else {
        format!("{path}/*")
    }
}
