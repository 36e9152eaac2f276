// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-request envelope passed between listener and route.
//!
//! The listener fills in the request side (method, uri, query, headers and
//! payload) and keeps the receiving half of the responder; the route fills
//! in the reply side and sends exactly one [`Relay`] back.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::core::ProxyError;
use crate::proxy::headers::HeaderPolicy;
use crate::proxy::payload::Payload;
use crate::proxy::response::ResponseInfo;

/// What the listener writes back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Relay {
    pub status: u16,
    pub content_type: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// One inbound request and, once forwarded, its reply.
#[derive(Debug)]
pub struct Exchange {
    id: String,
    pub method: Option<String>,
    pub uri: Option<String>,
    pub query: Option<String>,
    pub request_headers: HeaderMap,
    pub payload: Payload,
    pub content_encoding: Option<String>,
    pub reply_status: Option<u16>,
    pub reply_content_type: Option<String>,
    response: Option<ResponseInfo>,
    responder: Option<oneshot::Sender<Relay>>,
}

impl Exchange {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method: None,
            uri: None,
            query: None,
            request_headers: HeaderMap::new(),
            payload: Payload::default(),
            content_encoding: None,
            reply_status: None,
            reply_content_type: None,
            response: None,
            responder: None,
        }
    }

    /// Attach a fresh responder and return the half the listener waits on.
    pub fn with_responder(mut self) -> (Self, oneshot::Receiver<Relay>) {
        let (tx, rx) = oneshot::channel();
        self.responder = Some(tx);
        (self, rx)
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Store the inbound headers, minus those that are never forwarded.
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        self.request_headers = HeaderPolicy::filter_request(headers);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Per-request id used for log correlation.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn response(&self) -> Option<&ResponseInfo> {
        self.response.as_ref()
    }

    pub fn attach_response(&mut self, info: ResponseInfo) {
        self.response = Some(info);
    }

    /// Remove the attached response; a second call yields `None`.
    pub fn take_response(&mut self) -> Option<ResponseInfo> {
        self.response.take()
    }

    pub(crate) fn take_responder(&mut self) -> Option<oneshot::Sender<Relay>> {
        self.responder.take()
    }

    pub fn has_responder(&self) -> bool {
        self.responder.is_some()
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

type SuccessHook = Box<dyn FnOnce(&Exchange) + Send>;
type FailureHook = Box<dyn FnOnce(&Exchange, &ProxyError) + Send>;

/// Success and failure callbacks for one forwarded exchange.
///
/// Both outcomes consume the value, so at most one hook ever runs.
#[derive(Default)]
pub struct Completion {
    on_success: Option<SuccessHook>,
    on_failure: Option<FailureHook>,
}

impl Completion {
    /// No hooks at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&Exchange) + Send + 'static,
    {
        self.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&Exchange, &ProxyError) + Send + 'static,
    {
        self.on_failure = Some(Box::new(hook));
        self
    }

    pub fn succeed(self, exchange: &Exchange) {
        if let Some(hook) = self.on_success {
            hook(exchange);
        }
    }

    pub fn fail(self, exchange: &Exchange, error: &ProxyError) {
        if let Some(hook) = self.on_failure {
            hook(exchange, error);
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}
