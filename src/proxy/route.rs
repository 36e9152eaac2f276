// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The forwarding worker bound to one path prefix.
//!
//! Per request a [`ProxyRoute`] rebuilds the inbound call against its target
//! base URL, executes it on the shared client, and relays whatever came back.
//! Any failure along the way is answered with a bare 500; the caller never
//! sees the error text.

use async_trait::async_trait;
use reqwest::header::CONTENT_ENCODING;
use std::sync::Arc;

use crate::core::{CONTENT_TYPE_DEFAULT, ProxyError, Route};
use crate::logging::context::{self, LogContext};
use crate::proxy::exchange::{Completion, Exchange};
use crate::proxy::method::MethodDispatcher;
use crate::proxy::payload::{Payload, PayloadBody};
use crate::proxy::response::ResponseInfo;
use crate::proxy::writer::ResponseWriter;
use crate::server::{InboundConnection, MessageListener};
use crate::{debug_fmt, trace_fmt, warn_fmt};

/// Forwards every request under one prefix to one target.
pub struct ProxyRoute {
    route: Route,
    connection: Arc<dyn InboundConnection>,
    client: reqwest::Client,
    writer: ResponseWriter,
}

impl ProxyRoute {
    pub fn new(
        route: Route,
        connection: Arc<dyn InboundConnection>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            route,
            connection,
            client,
            writer: ResponseWriter::new(),
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// The inbound connection this route registers with.
    pub fn connection(&self) -> &Arc<dyn InboundConnection> {
        &self.connection
    }

    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }

    /// Start the writer and register the prefix with the connection.
    pub async fn start(self: &Arc<Self>) -> Result<(), ProxyError> {
        self.writer.start()?;
        let pattern = self.route.registration_pattern();
        let listener: Arc<dyn MessageListener> = self.clone();
        if let Err(e) = self.connection.register(&pattern, listener).await {
            let _ = self.writer.stop();
            return Err(e);
        }
        log::debug!(
            "Route {} started: {} -> {}",
            self.route.id,
            pattern,
            self.route.target_base_url
        );
        Ok(())
    }

    /// Deregister the prefix and stop the writer.  The writer is stopped even
    /// when deregistration fails.
    pub async fn stop(&self) -> Result<(), ProxyError> {
        let pattern = self.route.registration_pattern();
        let deregistered = self.connection.deregister(&pattern).await;
        let stopped = self.writer.stop();
        deregistered?;
        stopped?;
        log::debug!("Route {} stopped", self.route.id);
        Ok(())
    }

    /// The URL a request for `uri` (and optional `query`) is sent to.
    pub fn target_url(&self, uri: &str, query: Option<&str>) -> String {
        match query {
            Some(query) => format!("{}{}?{}", self.route.target_base_url, uri, query),
            None => format!("{}{}", self.route.target_base_url, uri),
        }
    }

    /// Forward one exchange and relay the outcome.  Never fails: errors are
    /// answered with a 500 and reported through the failure hook.
    pub async fn forward(&self, mut exchange: Exchange, completion: Completion) {
        let ctx = LogContext::new(self.route.id.clone(), exchange.id());
        context::scope(ctx, async move {
            match self.proxy(&mut exchange).await {
                Ok(()) => completion.succeed(&exchange),
                Err(e) => {
                    warn_fmt!(
                        context::label(),
                        "Encountered error attempting to proxy request, sending 500"
                    );
                    debug_fmt!(context::label(), "Proxy failure: {}", e);
                    self.relay_failure(&mut exchange);
                    completion.fail(&exchange, &e);
                }
            }
        })
        .await
    }

    async fn proxy(&self, exchange: &mut Exchange) -> Result<(), ProxyError> {
        let uri = exchange.uri.as_deref().ok_or(ProxyError::MissingMetadata("uri"))?;
        let url = self.target_url(uri, exchange.query.as_deref());
        let method = exchange
            .method
            .as_deref()
            .ok_or(ProxyError::MissingMetadata("method"))?;

        let request = MethodDispatcher::create(method, url)?
            .with_headers(&exchange.request_headers)
            .with_body(PayloadBody::new(exchange.payload.clone()));

        debug_fmt!(context::label(), "{} {}", request.method(), request.url());
        let response = request.build(&self.client).send().await?;

        let info = ResponseInfo::from_response(&response);
        exchange.content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let size = exchange.payload.fill_from(response.bytes_stream()).await?;
        trace_fmt!(
            context::label(),
            "{} from target, {} byte(s) of {}",
            info.status(),
            size,
            info.content_type()
        );

        exchange.reply_status = Some(info.status());
        exchange.reply_content_type = Some(info.content_type().to_string());
        exchange.attach_response(info);
        self.writer.write(exchange)
    }

    fn relay_failure(&self, exchange: &mut Exchange) {
        let info = ResponseInfo::failure();
        exchange.reply_status = Some(info.status());
        exchange.reply_content_type = Some(CONTENT_TYPE_DEFAULT.to_string());
        exchange.content_encoding = None;
        exchange.payload = Payload::default();
        exchange.attach_response(info);
        if let Err(e) = self.writer.write(exchange) {
            trace_fmt!(context::label(), "Failed to relay 500 to caller: {}", e);
        }
    }
}

// The connection's registry holds started routes, so printing it here would
// recurse.
impl std::fmt::Debug for ProxyRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyRoute")
            .field("route", &self.route)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageListener for ProxyRoute {
    async fn on_message(&self, exchange: Exchange, completion: Completion) {
        self.forward(exchange, completion).await
    }
}
