// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level entry-point – "turn the key and go".
//!
//! The [`WaypointLoader`] gathers configuration, initializes logging and
//! returns a [`Waypoint`]: one embedded listener plus the [`ProxyManager`]
//! whose routes register with it.

#[cfg(test)]
mod tests;

use log::LevelFilter;
use std::env;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{
    Config, ConfigBuilder, ConfigError, ConfigProvider, EnvConfigProvider, FileConfigProvider,
};
use crate::core::ProxyError;
use crate::logging::{self, config::LoggingConfig, log_error, log_info};
use crate::manager::ProxyManager;
use crate::server::{self, EmbeddedConnection, ServerConfig};

/// Errors that can occur while loading or running Waypoint.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Proxy error
    #[error("proxy error: {0}")]
    ProxyError(#[from] ProxyError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Builder for a configured [`Waypoint`].
///
/// Providers are layered in this order, later ones winning: providers added
/// with [`with_provider`](Self::with_provider), the configuration file, then
/// environment variables.
#[derive(Debug, Default)]
pub struct WaypointLoader {
    config: Option<Config>,
    providers: ConfigBuilder,
    config_file_path: Option<String>,
    use_env_vars: bool,
    env_prefix: Option<String>,
    client: Option<reqwest::Client>,
}

impl WaypointLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a ready-made configuration; every other source is ignored.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a configuration file to load.
    pub fn with_config_file(mut self, file_path: &str) -> Self {
        self.config_file_path = Some(file_path.to_string());
        self
    }

    /// Enable environment variable configuration.
    pub fn with_env_vars(mut self) -> Self {
        self.use_env_vars = true;
        self
    }

    /// Set a custom prefix for environment variables (default is "WAYPOINT_").
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.use_env_vars = true;
        self
    }

    /// Add a configuration provider.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.providers = self.providers.with_provider(provider);
        self
    }

    /// Forward with `client` instead of one built from the `client` section.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    fn build_config(self) -> Result<(Config, Option<reqwest::Client>), LoaderError> {
        if let Some(config) = self.config {
            return Ok((config, self.client));
        }

        let mut builder = self.providers;
        if let Some(file_path) = &self.config_file_path {
            builder = builder.with_provider(FileConfigProvider::new(file_path)?);
        }
        if self.use_env_vars {
            builder = match &self.env_prefix {
                Some(prefix) => builder.with_provider(EnvConfigProvider::new(prefix)),
                None => builder.with_provider(EnvConfigProvider::default()),
            };
        }
        Ok((builder.build(), self.client))
    }

    /// Load configuration, initialize logging and wire everything up.
    /// Nothing is listening or forwarding yet.
    pub async fn build(self) -> Result<Waypoint, LoaderError> {
        let (config, client) = self.build_config()?;

        let log_level = env::var("RUST_LOG_LEVEL")
            .ok()
            .as_deref()
            .and_then(logging::parse_level)
            .unwrap_or(LevelFilter::Info);

        match config.section::<LoggingConfig>("proxy.logging") {
            Ok(Some(logging_config)) => logging::init_with_config(log_level, &logging_config),
            Ok(None) => logging::init(Some(log_level)),
            Err(e) => {
                logging::init(Some(log_level));
                log_error("Startup", format!("Failed to read logging configuration: {e}"));
            }
        }

        let server_config = config.section::<ServerConfig>("server")?.unwrap_or_default();
        log_info(
            "Startup",
            format!("Waypoint configured for {}:{}", server_config.host, server_config.port),
        );

        let connection = Arc::new(EmbeddedConnection::new());
        let mut manager = ProxyManager::new(connection.clone());
        if let Some(client) = client {
            manager = manager.with_client(client);
        }

        Ok(Waypoint {
            config: Arc::new(config),
            server_config,
            connection,
            manager,
        })
    }
}

/// A loaded instance: configuration, listener and manager.
#[derive(Debug)]
pub struct Waypoint {
    config: Arc<Config>,
    server_config: ServerConfig,
    connection: Arc<EmbeddedConnection>,
    manager: ProxyManager,
}

impl Waypoint {
    /// Shorthand for [`WaypointLoader::new`].
    pub fn loader() -> WaypointLoader {
        WaypointLoader::new()
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn server_config(&self) -> &ServerConfig {
        &self.server_config
    }

    pub fn connection(&self) -> &Arc<EmbeddedConnection> {
        &self.connection
    }

    pub fn manager(&self) -> &ProxyManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ProxyManager {
        &mut self.manager
    }

    /// Initialize and start the manager.
    pub async fn start(&mut self) -> Result<(), LoaderError> {
        self.manager.initialize(&self.config).await?;
        self.manager.start().await?;
        Ok(())
    }

    /// Stop and destroy the manager.  Destroy runs even when stopping
    /// reported failures; the stop error is returned afterwards.
    pub async fn shutdown(&mut self) -> Result<(), LoaderError> {
        let stopped = self.manager.stop().await;
        self.manager.destroy().await?;
        stopped?;
        Ok(())
    }

    /// Start, serve on `listener` until `shutdown` completes, then shut down.
    pub async fn run_until<F>(
        mut self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), LoaderError>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        let served = self.connection.clone().serve(listener, shutdown).await;
        let stopped = self.shutdown().await;
        served?;
        stopped
    }

    /// Bind the configured address and run until Ctrl-C or SIGTERM.
    pub async fn run(self) -> Result<(), LoaderError> {
        let listener = server::bind(&self.server_config).await?;
        self.run_until(listener, server::shutdown_signal()).await
    }
}
