// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turns `prefix::target` configuration entries into routes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::{PROXY_PREFIX, Route, SEPARATOR};
use crate::proxy::route::ProxyRoute;
use crate::server::InboundConnection;

/// Parse one entry.  `key` is the suffix after `interlok.proxy.`.
///
/// Returns `None` unless the value splits on `::` into exactly two
/// non-empty parts.
pub fn parse_entry(key: &str, value: &str) -> Option<Route> {
    let parts: Vec<&str> = value.split(SEPARATOR).map(str::trim).collect();
    match parts.as_slice() {
        [prefix, target] if !prefix.is_empty() && !target.is_empty() => {
            Some(Route::new(format!("{PROXY_PREFIX}{key}"), *prefix, *target))
        }
        _ => None,
    }
}

/// Builder for the routes of one manager.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteTable;

impl RouteTable {
    /// Build a route per well-formed entry, in key order.  Every route shares
    /// `connection` and a clone of `client` (and therefore its pool).
    pub fn build(
        entries: &BTreeMap<String, String>,
        connection: Arc<dyn InboundConnection>,
        client: &reqwest::Client,
    ) -> Vec<Arc<ProxyRoute>> {
        entries
            .iter()
            .filter_map(|(key, value)| {
                let route = parse_entry(key, value);
                if route.is_none() {
                    log::trace!(
                        "Ignoring {PROXY_PREFIX}{key}={value}: expected <prefix>{SEPARATOR}<target>"
                    );
                }
                route
            })
            .map(|route| Arc::new(ProxyRoute::new(route, connection.clone(), client.clone())))
            .collect()
    }
}
