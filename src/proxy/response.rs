// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! What to tell the original caller: status, content type and headers.

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap};

use crate::core::CONTENT_TYPE_DEFAULT;
use crate::proxy::headers::HeaderPolicy;

/// Response metadata captured from a backend call, or synthesized for a
/// failed one.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInfo {
    status: u16,
    content_type: String,
    headers: HeaderMap,
}

impl ResponseInfo {
    pub fn new(status: u16, content_type: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            headers,
        }
    }

    /// Capture status, content type and relayable headers of a backend response.
    pub fn from_parts(status: StatusCode, headers: &HeaderMap) -> Self {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(CONTENT_TYPE_DEFAULT);

        Self::new(status.as_u16(), content_type, HeaderPolicy::filter_response(headers))
    }

    /// Capture from a received (but not yet consumed) reqwest response.
    pub fn from_response(response: &reqwest::Response) -> Self {
        Self::from_parts(response.status(), response.headers())
    }

    /// The value sent when forwarding failed for any reason.
    pub fn failure() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            CONTENT_TYPE_DEFAULT,
            HeaderMap::new(),
        )
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl Default for ResponseInfo {
    fn default() -> Self {
        Self::failure()
    }
}
