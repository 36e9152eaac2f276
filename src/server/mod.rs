// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The inbound side: a shared connection that routes register with.
//!
//! [`InboundConnection`] is the seam between the forwarding engine and
//! whatever accepts HTTP requests.  [`EmbeddedConnection`] is the bundled
//! implementation, a thin wrapper around **hyper-util**: it keeps a registry
//! of wildcard patterns and, per request, builds an [`Exchange`], hands it
//! to the owning listener on a task of its own and writes back the
//! [`Relay`] it receives.
//!
//! Uses `hyper_util::server::conn::auto::Builder`, so the same connection
//! transparently handles both HTTP/1.1 *and* HTTP/2.


use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::Debug;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinSet;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::core::{CONTENT_TYPE_DEFAULT, ProxyError};
use crate::proxy::exchange::{Completion, Exchange, Relay};

/// How long open connections get to finish after shutdown is requested.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the embedded listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ProxyError> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .map_err(|e| ProxyError::ConfigError(format!("Invalid server address: {e}")))
    }
}

/// Something that consumes exchanges for a registered pattern.
#[async_trait]
pub trait MessageListener: Debug + Send + Sync {
    /// Handle one exchange.  Exactly one relay is expected through the
    /// exchange's responder; dropping it unanswered yields a bare 500.
    async fn on_message(&self, exchange: Exchange, completion: Completion);
}

/// A listener shared by every route of a manager.
#[async_trait]
pub trait InboundConnection: Debug + Send + Sync {
    /// Route requests matching `pattern` to `listener`.
    async fn register(
        &self,
        pattern: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), ProxyError>;

    /// Stop routing requests for `pattern`.
    async fn deregister(&self, pattern: &str) -> Result<(), ProxyError>;
}

/// Whether `path` falls under `pattern`.
///
/// `/x/*` matches `/x` itself and anything below it; `/*` matches every
/// path; a pattern without the wildcard matches only itself.
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix("/*") {
        Some("") => true,
        Some(base) => {
            path == base || (path.starts_with(base) && path[base.len()..].starts_with('/'))
        }
        None => pattern == path,
    }
}

/// The bundled [`InboundConnection`]: a pattern registry plus an HTTP server.
#[derive(Debug, Default)]
pub struct EmbeddedConnection {
    registry: RwLock<BTreeMap<String, Arc<dyn MessageListener>>>,
}

impl EmbeddedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered patterns, sorted.
    pub async fn patterns(&self) -> Vec<String> {
        self.registry.read().await.keys().cloned().collect()
    }

    /// The listener owning `path`; the longest matching pattern wins.
    pub async fn resolve(&self, path: &str) -> Option<Arc<dyn MessageListener>> {
        self.registry
            .read()
            .await
            .iter()
            .filter(|(pattern, _)| pattern_matches(pattern, path))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, listener)| listener.clone())
    }

    /// Hand `exchange` to its listener on a task of its own and wait for the
    /// relay.
    pub async fn dispatch(&self, exchange: Exchange) -> Relay {
        let path = exchange.uri.clone().unwrap_or_default();
        let Some(listener) = self.resolve(&path).await else {
            debug!("No route for {path}");
            return bare_relay(StatusCode::NOT_FOUND);
        };

        let (exchange, rx) = exchange.with_responder();
        let task =
            tokio::spawn(async move { listener.on_message(exchange, Completion::none()).await });

        match rx.await {
            Ok(relay) => relay,
            Err(_) => {
                if let Err(e) = task.await {
                    error!("Listener for {path} failed: {e}");
                } else {
                    warn!("Listener for {path} finished without relaying a response");
                }
                bare_relay(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Serve requests accepted on `listener` until `shutdown` completes,
    /// then drain open connections.
    pub async fn serve<F>(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ProxyError>
    where
        F: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        info!("Waypoint listening on http://{addr}");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut join_set = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested; no longer accepting connections");
                    break;
                }
                accept = listener.accept() => {
                    match accept {
                        Ok((stream, remote_addr)) => {
                            trace!("Accepted connection from {remote_addr}");
                            let connection = self.clone();
                            let mut shutdown_rx = shutdown_rx.clone();

                            join_set.spawn(async move {
                                let service = service_fn(move |req: Request<Incoming>| {
                                    handle_request(req, connection.clone())
                                });
                                let io = TokioIo::new(stream);

                                let builder = {
                                    let mut b = AutoBuilder::new(TokioExecutor::new());
                                    b.http1();
                                    b.http2();
                                    b
                                };

                                let conn = builder.serve_connection(io, service);
                                let mut conn = std::pin::pin!(conn);

                                tokio::select! {
                                    res = &mut conn => log_connection_end(res),
                                    _ = shutdown_rx.changed() => {
                                        debug!("Connection shutting down gracefully");
                                        conn.as_mut().graceful_shutdown();
                                        log_connection_end(conn.await);
                                    }
                                }
                            });
                        }
                        Err(e) => error!("Accept error: {e}"),
                    }
                }
            }
        }

        let _ = shutdown_tx.send(true);
        info!("Waiting for {} connection(s) to close", join_set.len());

        let drain = async {
            while let Some(res) = join_set.join_next().await {
                if let Err(e) = res {
                    if !e.is_cancelled() {
                        error!("Connection task failed: {e}");
                    }
                }
            }
        };

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
            warn!(
                "Shutdown timed out after {} seconds, closing remaining connections",
                SHUTDOWN_TIMEOUT.as_secs()
            );
            join_set.shutdown().await;
        }

        info!("Listener on {addr} stopped");
        Ok(())
    }
}

#[async_trait]
impl InboundConnection for EmbeddedConnection {
    async fn register(
        &self,
        pattern: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), ProxyError> {
        let mut registry = self.registry.write().await;
        if registry.contains_key(pattern) {
            return Err(ProxyError::Registration(format!("{pattern} is already registered")));
        }
        registry.insert(pattern.to_string(), listener);
        debug!("Registered {pattern}");
        Ok(())
    }

    async fn deregister(&self, pattern: &str) -> Result<(), ProxyError> {
        match self.registry.write().await.remove(pattern) {
            Some(_) => {
                debug!("Deregistered {pattern}");
                Ok(())
            }
            None => Err(ProxyError::Registration(format!("{pattern} is not registered"))),
        }
    }
}

/// Bind a TCP listener for `config`.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ProxyError> {
    let addr = config.socket_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| ProxyError::Other(format!("Failed to bind {addr}: {e}")))
}

/// Completes on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Cannot install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C; initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM; initiating graceful shutdown"),
    }
}

fn log_connection_end<E: std::fmt::Display>(res: Result<(), E>) {
    match res {
        Ok(()) => trace!("Connection closed"),
        Err(e) => {
            let msg = e.to_string();
            if !msg.contains("connection closed") && !msg.contains("connection reset") {
                error!("Connection error: {msg}");
            }
        }
    }
}

fn bare_relay(status: StatusCode) -> Relay {
    Relay {
        status: status.as_u16(),
        content_type: CONTENT_TYPE_DEFAULT.to_string(),
        headers: Default::default(),
        body: Bytes::new(),
    }
}

/// Build an exchange from a hyper request.
async fn convert_hyper_request(req: Request<Incoming>) -> Result<Exchange, ProxyError> {
    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| ProxyError::Other(format!("Failed to read request body: {e}")))?
        .to_bytes();

    let mut exchange = Exchange::new()
        .with_method(parts.method.as_str())
        .with_uri(parts.uri.path())
        .with_headers(&parts.headers)
        .with_payload(body);
    if let Some(query) = parts.uri.query() {
        exchange = exchange.with_query(query);
    }
    Ok(exchange)
}

/// Convert a relay into a hyper response.
fn convert_relay(relay: Relay) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(relay.status).unwrap_or_else(|_| {
        warn!("Relayed status {} is not valid HTTP, sending 500", relay.status);
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut headers = relay.headers;
    if !headers.contains_key(CONTENT_TYPE) {
        if let Ok(value) = HeaderValue::from_str(&relay.content_type) {
            headers.insert(CONTENT_TYPE, value);
        }
    }

    let mut response = Response::new(Full::new(relay.body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Handle an incoming HTTP request.
async fn handle_request(
    req: Request<Incoming>,
    connection: Arc<EmbeddedConnection>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    debug!("Received request: {method} {path}");

    let relay = match convert_hyper_request(req).await {
        Ok(exchange) => connection.dispatch(exchange).await,
        Err(e) => {
            error!("Failed to convert request {method} {path}: {e}");
            bare_relay(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    debug!("Answered {method} {path} -> {}", relay.status);
    Ok(convert_relay(relay))
}
