// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The forwarding engine.
//!
//! * [`RouteTable`] turns configuration entries into [`ProxyRoute`]s.
//! * A [`ProxyRoute`] receives [`Exchange`]s from the inbound connection,
//!   builds an [`OutboundRequest`] through the [`MethodDispatcher`], and
//!   relays the [`ResponseInfo`] it captured through its [`ResponseWriter`].

pub mod exchange;
pub mod headers;
pub mod method;
pub mod payload;
pub mod response;
pub mod route;
pub mod table;
pub mod writer;

pub use exchange::{Completion, Exchange, Relay};
pub use headers::HeaderPolicy;
pub use method::{MethodDispatcher, OutboundRequest};
pub use payload::{Payload, PayloadBody};
pub use response::ResponseInfo;
pub use route::ProxyRoute;
pub use table::{RouteTable, parse_entry};
pub use writer::ResponseWriter;
