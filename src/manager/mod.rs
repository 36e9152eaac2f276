// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Owns the routes and the shared HTTP client, and drives them through
//! `initialize → start → stop → destroy`.


use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::core::{PROXY_PREFIX, ProxyError};
use crate::proxy::{ProxyRoute, RouteTable};
use crate::server::InboundConnection;

/// Tuning for the shared outbound client.  Everything is optional; absent
/// timeouts mean none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Whole-request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Connect timeout in seconds
    #[serde(default)]
    pub connect_timeout: Option<u64>,

    /// Maximum idle pooled connections per host
    #[serde(default)]
    pub pool_max_idle_per_host: Option<usize>,

    /// Seconds an idle pooled connection is kept
    #[serde(default)]
    pub pool_idle_timeout: Option<u64>,
}

impl ClientConfig {
    /// Build the client.  Redirects are relayed to the caller, never followed.
    pub fn build_client(&self) -> Result<reqwest::Client, ProxyError> {
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());

        if let Some(secs) = self.timeout {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.connect_timeout {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(max) = self.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }
        if let Some(secs) = self.pool_idle_timeout {
            builder = builder.pool_idle_timeout(Duration::from_secs(secs));
        }

        Ok(builder.build()?)
    }
}

/// Where a [`ProxyManager`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Initialized,
    Started,
    Stopped,
    Destroyed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Initialized => "initialized",
            LifecycleState::Started => "started",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// The set of tunnels configured for one inbound connection.
#[derive(Debug)]
pub struct ProxyManager {
    state: LifecycleState,
    connection: Arc<dyn InboundConnection>,
    client: Option<reqwest::Client>,
    routes: Vec<Arc<ProxyRoute>>,
}

impl ProxyManager {
    pub fn new(connection: Arc<dyn InboundConnection>) -> Self {
        Self {
            state: LifecycleState::Created,
            connection,
            client: None,
            routes: Vec::new(),
        }
    }

    /// Use `client` instead of building one from the `client` section.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn routes(&self) -> &[Arc<ProxyRoute>] {
        &self.routes
    }

    pub fn client(&self) -> Option<&reqwest::Client> {
        self.client.as_ref()
    }

    pub fn connection(&self) -> &Arc<dyn InboundConnection> {
        &self.connection
    }

    fn expect_state(&self, allowed: &[LifecycleState], operation: &str) -> Result<(), ProxyError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ProxyError::Lifecycle(format!(
                "cannot {operation} a manager that is {}",
                self.state
            )))
        }
    }

    /// Build the shared client and one route per well-formed entry under
    /// `interlok.proxy.`.
    pub async fn initialize(&mut self, config: &Config) -> Result<(), ProxyError> {
        self.expect_state(&[LifecycleState::Created], "initialize")?;

        let entries = config.string_entries(PROXY_PREFIX)?;
        let client = match self.client.take() {
            Some(client) => client,
            None => config
                .section::<ClientConfig>("client")?
                .unwrap_or_default()
                .build_client()?,
        };

        self.routes = RouteTable::build(&entries, self.connection.clone(), &client);
        self.client = Some(client);
        self.state = LifecycleState::Initialized;

        log::info!(
            "Initialized {} route(s) from {} entr{}",
            self.routes.len(),
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" }
        );
        Ok(())
    }

    /// Start every route in order.  The first failure stops the routes that
    /// were already started and is returned; the manager stays initialized.
    pub async fn start(&mut self) -> Result<(), ProxyError> {
        self.expect_state(&[LifecycleState::Initialized], "start")?;

        for (index, route) in self.routes.iter().enumerate() {
            if let Err(e) = route.start().await {
                log::error!("Failed to start {}: {}", route.route().id, e);
                for started in self.routes[..index].iter().rev() {
                    if let Err(rollback) = started.stop().await {
                        log::warn!("Failed to roll back {}: {}", started.route().id, rollback);
                    }
                }
                return Err(e);
            }
        }

        self.state = LifecycleState::Started;
        log::info!("Started {} route(s)", self.routes.len());
        Ok(())
    }

    /// Stop every route, even when some fail.  Failures are returned together
    /// and the manager is stopped regardless.
    pub async fn stop(&mut self) -> Result<(), ProxyError> {
        self.expect_state(&[LifecycleState::Started], "stop")?;

        let mut failures = Vec::new();
        for route in &self.routes {
            if let Err(e) = route.stop().await {
                log::warn!("Failed to stop {}: {}", route.route().id, e);
                failures.push(e);
            }
        }

        self.state = LifecycleState::Stopped;
        if failures.is_empty() {
            log::info!("Stopped {} route(s)", self.routes.len());
            Ok(())
        } else {
            Err(ProxyError::Aggregate(failures))
        }
    }

    /// Release the routes and the shared client.
    pub async fn destroy(&mut self) -> Result<(), ProxyError> {
        self.expect_state(
            &[LifecycleState::Initialized, LifecycleState::Stopped],
            "destroy",
        )?;

        self.routes.clear();
        self.client = None;
        self.state = LifecycleState::Destroyed;
        log::debug!("Manager destroyed");
        Ok(())
    }
}
