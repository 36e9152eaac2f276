// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use crate::config::PropertiesConfigProvider;
use crate::manager::LifecycleState;
use serde_json::json;
use std::io::Write;

fn provider() -> PropertiesConfigProvider {
    PropertiesConfigProvider::new()
        .with_property("interlok.proxy.1", "/one::http://localhost:5555")
        .with_property("interlok.proxy.2", "/two::http://localhost:5556")
        .with_value("server.port", json!(9090))
}

#[tokio::test]
async fn test_loader_with_provider() {
    let waypoint = WaypointLoader::new().with_provider(provider()).build().await.unwrap();

    assert_eq!(waypoint.server_config().port, 9090);
    assert_eq!(waypoint.server_config().host, "127.0.0.1");
    assert_eq!(waypoint.manager().state(), LifecycleState::Created);
    assert_eq!(
        waypoint.config().get::<String>("interlok.proxy.1").unwrap().unwrap(),
        "/one::http://localhost:5555"
    );
}

#[tokio::test]
async fn test_later_providers_override() {
    let overrides = PropertiesConfigProvider::new().with_value("server.port", json!(9191));
    let waypoint = WaypointLoader::new()
        .with_provider(provider())
        .with_provider(overrides)
        .build()
        .await
        .unwrap();

    assert_eq!(waypoint.server_config().port, 9191);
}

#[tokio::test]
async fn test_loader_with_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[server]
host = "0.0.0.0"
port = 8181

[interlok.proxy]
jolokia = "/jolokia::http://localhost:8161"
"#
    )
    .unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let mut waypoint = WaypointLoader::new().with_config_file(&path).build().await.unwrap();
    assert_eq!(waypoint.server_config().host, "0.0.0.0");
    assert_eq!(waypoint.server_config().port, 8181);

    waypoint.start().await.unwrap();
    assert_eq!(waypoint.connection().patterns().await, vec!["/jolokia/*"]);
    waypoint.shutdown().await.unwrap();
    assert_eq!(waypoint.manager().state(), LifecycleState::Destroyed);
    assert!(waypoint.connection().patterns().await.is_empty());
}

#[tokio::test]
async fn test_missing_config_file() {
    let err = WaypointLoader::new()
        .with_config_file("/definitely/not/here.toml")
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, LoaderError::ConfigError(_)));
}

#[tokio::test]
async fn test_with_config_ignores_other_sources() {
    let config = Config::builder().with_provider(provider()).build();
    let waypoint = WaypointLoader::new()
        .with_config(config)
        .with_config_file("/definitely/not/here.toml")
        .build()
        .await
        .unwrap();
    assert_eq!(waypoint.server_config().port, 9090);
}

#[tokio::test]
async fn test_start_failure_surfaces_as_proxy_error() {
    let duplicate = PropertiesConfigProvider::new()
        .with_property("interlok.proxy.1", "/same::http://localhost:5555")
        .with_property("interlok.proxy.2", "/same::http://localhost:5556");
    let mut waypoint = WaypointLoader::new().with_provider(duplicate).build().await.unwrap();

    let err = waypoint.start().await.unwrap_err();
    assert!(matches!(err, LoaderError::ProxyError(ProxyError::Registration(_))));
    assert!(waypoint.connection().patterns().await.is_empty());
}

#[tokio::test]
async fn test_run_until_shutdown() {
    let waypoint = WaypointLoader::new().with_provider(provider()).build().await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let connection = waypoint.connection().clone();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(waypoint.run_until(listener, async {
        let _ = rx.await;
    }));

    // wait for the routes to register
    for _ in 0..50 {
        if connection.patterns().await.len() == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(connection.patterns().await, vec!["/one/*", "/two/*"]);

    tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert!(connection.patterns().await.is_empty());
}
