// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Waypoint - one HTTP listener, many tunnels.
//!
//! Each configured entry binds an inbound path prefix to a backend base URL:
//!
//! ```text
//! interlok.proxy.jolokia = /jolokia::http://localhost:8161
//! interlok.proxy.api     = /api::http://10.0.0.7:9000
//! ```
//!
//! A request for `listener/jolokia/read?x=y` is replayed as
//! `http://localhost:8161/jolokia/read?x=y`, and the backend's status,
//! content type, headers and body are relayed back.  Anything that goes
//! wrong on the way is answered with a bare `500`.
//!
//! # Configuration System
//!
//! - **Multiple Configuration Sources**: files (JSON, TOML, YAML,
//!   `.properties`), environment variables and in-memory properties.
//! - **Layered Configuration**: later providers override earlier ones.
//! - **Type Safety**: sections such as `client` and `server` deserialize into
//!   typed structs.
//!
//! # Running
//!
//! ```rust,no_run
//! use waypoint::Waypoint;
//!
//! # async fn run() -> Result<(), waypoint::LoaderError> {
//! let waypoint = Waypoint::loader()
//!     .with_config_file("config.toml")
//!     .with_env_vars()
//!     .build()
//!     .await?;
//!
//! // serves until Ctrl-C / SIGTERM, then stops every route
//! waypoint.run().await
//! # }
//! ```

// Module declarations
pub mod config;
pub mod core;
pub mod loader;
pub mod logging;
pub mod manager;
pub mod proxy;
pub mod server;

// Re-export key types at the crate root for convenience
pub use config::{Config, ConfigError, ConfigProvider, ConfigProviderExt};
pub use core::{HttpMethod, PROXY_PREFIX, ProxyError, Route, SEPARATOR};
pub use loader::{LoaderError, Waypoint, WaypointLoader};
pub use manager::{ClientConfig, LifecycleState, ProxyManager};
pub use proxy::{
    Completion, Exchange, HeaderPolicy, MethodDispatcher, Payload, PayloadBody, ProxyRoute,
    Relay, ResponseInfo, ResponseWriter, RouteTable,
};
pub use server::{EmbeddedConnection, InboundConnection, MessageListener, ServerConfig};
