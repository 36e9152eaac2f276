// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relays a captured response back through the exchange's responder.

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::ProxyError;
use crate::proxy::exchange::{Exchange, Relay};

/// Response-writing service owned by one route.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    started: AtomicBool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Result<(), ProxyError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn stop(&self) -> Result<(), ProxyError> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Consume the exchange's [`ResponseInfo`](crate::proxy::ResponseInfo)
    /// and send status, content type, headers and payload to the caller.
    ///
    /// Reply metadata set on the exchange takes precedence over the values
    /// captured in the response info.
    pub fn write(&self, exchange: &mut Exchange) -> Result<(), ProxyError> {
        if !self.is_started() {
            return Err(ProxyError::Lifecycle("response writer not started".into()));
        }

        let info = exchange
            .take_response()
            .ok_or_else(|| ProxyError::Relay("no response attached to exchange".into()))?;
        let responder = exchange
            .take_responder()
            .ok_or_else(|| ProxyError::Relay("exchange has no responder".into()))?;

        let status = exchange.reply_status.unwrap_or(info.status());
        let content_type = exchange
            .reply_content_type
            .clone()
            .unwrap_or_else(|| info.content_type().to_string());

        let mut headers = info.headers().clone();
        match HeaderValue::from_str(&content_type) {
            Ok(value) => {
                headers.insert(CONTENT_TYPE, value);
            }
            Err(e) => log::trace!("dropping unusable content type {content_type:?}: {e}"),
        }

        responder
            .send(Relay {
                status,
                content_type,
                headers,
                body: exchange.payload.as_bytes().clone(),
            })
            .map_err(|_| ProxyError::Relay("caller is no longer waiting".into()))
    }
}
