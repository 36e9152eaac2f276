// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-request logging correlation.
//!
//! A [`LogContext`] is attached to the task that forwards one request and is
//! visible to everything that runs inside [`scope`].  Leaving the scope (by
//! completing, returning early, or panicking) drops the context, so nothing
//! leaks into the next request served by the same worker.

use std::fmt;
use std::future::Future;

tokio::task_local! {
    static LOG_CONTEXT: LogContext;
}

/// Identity stamped onto log lines emitted while forwarding a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    /// The route (tunnel) handling the request.
    pub component: String,
    /// The per-request exchange id.
    pub exchange_id: String,
}

impl LogContext {
    pub fn new(component: impl Into<String>, exchange_id: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            exchange_id: exchange_id.into(),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.exchange_id)
    }
}

/// Run `fut` with `context` installed.
pub async fn scope<F: Future>(context: LogContext, fut: F) -> F::Output {
    LOG_CONTEXT.scope(context, fut).await
}

/// The context of the current task, if any.
pub fn current() -> Option<LogContext> {
    LOG_CONTEXT.try_with(Clone::clone).ok()
}

/// Label for `*_fmt!` macros: the current context, or `-` outside of one.
pub fn label() -> String {
    current()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string())
}
