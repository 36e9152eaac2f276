// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common test utilities for the Waypoint integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use waypoint::config::PropertiesConfigProvider;
use waypoint::{Completion, Config, EmbeddedConnection, ProxyRoute, Route};

/// Configuration made of `interlok.proxy.*` entries (key suffix, value).
#[allow(dead_code)]
pub fn proxy_config(entries: &[(&str, String)]) -> Config {
    let provider = entries.iter().fold(PropertiesConfigProvider::new(), |p, (key, value)| {
        p.with_property(&format!("interlok.proxy.{key}"), value)
    });
    Config::builder().with_provider(provider).build()
}

/// A started route for `/jolokia` forwarding to `target`.
#[allow(dead_code)]
pub async fn jolokia_route(target: &str) -> Arc<ProxyRoute> {
    let route = Arc::new(ProxyRoute::new(
        Route::new("interlok.proxy.jolokia", "/jolokia", target),
        Arc::new(EmbeddedConnection::new()),
        reqwest::Client::new(),
    ));
    route.start().await.expect("route should start");
    route
}

/// Records which completion hook fired.
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    succeeded: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl Outcome {
    pub fn completion(&self) -> Completion {
        let succeeded = self.succeeded.clone();
        let failed = self.failed.clone();
        Completion::none()
            .on_success(move |_| succeeded.store(true, Ordering::SeqCst))
            .on_failure(move |_, _| failed.store(true, Ordering::SeqCst))
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// A listener serving `connection` on an ephemeral port.
#[allow(dead_code)]
pub struct RunningListener {
    pub addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), waypoint::ProxyError>>,
}

#[allow(dead_code)]
impl RunningListener {
    pub async fn start(connection: Arc<EmbeddedConnection>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(connection.serve(listener, async {
            let _ = rx.await;
        }));
        Self {
            addr,
            stop: Some(tx),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        self.handle.await.expect("join").expect("serve");
    }
}
