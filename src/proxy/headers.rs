// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Header policy: which headers never cross the tunnel.
//!
//! Framing headers (`Content-Length`, `Transfer-Encoding`) are recomputed by
//! each hop's own HTTP stack.  `Host` and `Accept-Encoding` describe the
//! caller's hop, not ours; the outbound client picks its own.

use reqwest::header::{
    ACCEPT_ENCODING, CONTENT_LENGTH, HOST, HeaderMap, HeaderName, TRANSFER_ENCODING,
};

/// Request headers never forwarded to the target.
pub const IGNORED_REQUEST_HEADERS: [HeaderName; 4] =
    [HOST, ACCEPT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING];

/// Response headers never relayed back to the caller.
pub const IGNORED_RESPONSE_HEADERS: [HeaderName; 2] = [CONTENT_LENGTH, TRANSFER_ENCODING];

/// Static allow/deny rules for both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderPolicy;

impl HeaderPolicy {
    /// Whether an inbound request header may be forwarded.
    pub fn forwards_request_header(name: &HeaderName) -> bool {
        !IGNORED_REQUEST_HEADERS.contains(name)
    }

    /// Whether a backend response header may be relayed.
    pub fn relays_response_header(name: &HeaderName) -> bool {
        !IGNORED_RESPONSE_HEADERS.contains(name)
    }

    /// Copy of `headers` without the inbound ignore-list.
    pub fn filter_request(headers: &HeaderMap) -> HeaderMap {
        retain(headers, Self::forwards_request_header)
    }

    /// Copy of `headers` without the outbound ignore-list.
    pub fn filter_response(headers: &HeaderMap) -> HeaderMap {
        retain(headers, Self::relays_response_header)
    }
}

fn retain(headers: &HeaderMap, keep: fn(&HeaderName) -> bool) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if keep(name) {
            // append, not insert: repeated headers keep every value
            out.append(name.clone(), value.clone());
        }
    }
    out
}
