// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests: HTTP client → bound listener → route → mock backend.

use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use waypoint::{EmbeddedConnection, ProxyManager, Waypoint};

mod common;
use common::{RunningListener, proxy_config};

async fn backend(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(path_regex(".*"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string(body),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_one_listener_many_tunnels() {
    let jolokia = backend("Hello from Undertow").await;
    let api = backend("Hello from the API").await;

    let config = proxy_config(&[
        ("jolokia", format!("/jolokia::{}", jolokia.uri())),
        ("api", format!("/api::{}", api.uri())),
        ("broken", "no separator here".to_string()),
    ]);

    let connection = Arc::new(EmbeddedConnection::new());
    let mut manager = ProxyManager::new(connection.clone());
    manager.initialize(&config).await.unwrap();
    assert_eq!(manager.routes().len(), 2);
    manager.start().await.unwrap();

    let listener = RunningListener::start(connection.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(listener.url("/jolokia?a=b&c=d"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "Hello from Undertow");

    let received = jolokia.received_requests().await.unwrap();
    assert_eq!(received[0].url.path(), "/jolokia");
    assert_eq!(received[0].url.query(), Some("a=b&c=d"));

    let response = client.get(listener.url("/api/v1/items")).send().await.unwrap();
    assert_eq!(response.text().await.unwrap(), "Hello from the API");
    assert_eq!(api.received_requests().await.unwrap()[0].url.path(), "/api/v1/items");

    let response = client.get(listener.url("/unknown")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    manager.stop().await.unwrap();
    let response = client.get(listener.url("/jolokia")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    manager.destroy().await.unwrap();
    listener.stop().await;
}

#[tokio::test]
async fn test_post_body_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo/data"))
        .respond_with(|req: &wiremock::Request| {
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(req.body.clone())
        })
        .mount(&server)
        .await;

    let config = proxy_config(&[("echo", format!("/echo::{}", server.uri()))]);
    let connection = Arc::new(EmbeddedConnection::new());
    let mut manager = ProxyManager::new(connection.clone());
    manager.initialize(&config).await.unwrap();
    manager.start().await.unwrap();
    let listener = RunningListener::start(connection).await;

    let payload: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
    let response = reqwest::Client::new()
        .post(listener.url("/echo/data"))
        .body(payload.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/octet-stream");
    assert_eq!(response.bytes().await.unwrap().to_vec(), payload);

    manager.stop().await.unwrap();
    listener.stop().await;
}

#[tokio::test]
async fn test_unreachable_target_is_plain_500() {
    let port = {
        let socket = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        socket.local_addr().unwrap().port()
    };
    let config = proxy_config(&[("dead", format!("/dead::http://127.0.0.1:{port}"))]);

    let connection = Arc::new(EmbeddedConnection::new());
    let mut manager = ProxyManager::new(connection.clone());
    manager.initialize(&config).await.unwrap();
    manager.start().await.unwrap();
    let listener = RunningListener::start(connection).await;

    let response = reqwest::get(listener.url("/dead/thing")).await.unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "");

    manager.stop().await.unwrap();
    listener.stop().await;
}

#[tokio::test]
async fn test_loaded_waypoint_serves_until_shutdown() {
    let jolokia = backend("Hello from Undertow").await;
    let config = proxy_config(&[("jolokia", format!("/jolokia::{}", jolokia.uri()))]);

    let waypoint = Waypoint::loader().with_config(config).build().await.unwrap();
    let connection = waypoint.connection().clone();
    let socket = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(waypoint.run_until(socket, async {
        let _ = rx.await;
    }));

    for _ in 0..50 {
        if !connection.patterns().await.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let body = reqwest::get(format!("http://{addr}/jolokia"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "Hello from Undertow");

    tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert!(connection.patterns().await.is_empty());
}
