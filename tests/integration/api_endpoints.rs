//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - The scrape endpoint serves current readings with the right content type
//! - Health needs no dependency
//! - Device management works over a real socket
//! - Error bodies are JSON

use std::net::SocketAddr;

use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Value, json};
use shelly_exporter::{
    Device,
    api::{ApiConfig, ApiServer, ApiState, spawn_api_server},
    observations::ObservationStore,
    registry::DeviceRegistry,
};
use wiremock::MockServer;

use crate::helpers::*;

// Helper to create test API server
async fn spawn_test_api(registry: &DeviceRegistry, store: &ObservationStore) -> ApiServer {
    let config = ApiConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)), // Random port
    };

    spawn_api_server(config, ApiState::new(registry.clone(), store.clone()))
        .await
        .unwrap()
}

fn url(server: &ApiServer, path: &str) -> String {
    format!("http://{}{path}", server.addr())
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = spawn_test_api(&DeviceRegistry::new(), &ObservationStore::new()).await;

    let response = reqwest::get(url(&server, "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");

    server.shutdown().await;
}

#[tokio::test]
async fn test_metrics_endpoint_serves_sampled_readings() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, switch_status_json(12.3, 230.0, 50.0, 0.05)).await;

    let registry = DeviceRegistry::new();
    let store = ObservationStore::new();
    registry.add(device_for(&mock_server, "p1")).await;
    // known but never answering, so it must not appear
    registry.add(Device::new("p2", "127.0.0.1", 9)).await;

    let mut scheduler = manual_scheduler(&registry, &store);
    scheduler.start().unwrap();
    scheduler.tick_now().await.unwrap();

    let server = spawn_test_api(&registry, &store).await;
    let response = reqwest::get(url(&server, "/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain; version=0.0.4")
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("shelly_apower_watts{instance=\"p1\"} 12.300000\n"));
    assert!(!body.contains("p2"));
    assert_eq!(body.lines().count(), 4);

    scheduler.stop().await;
    server.shutdown().await;
}

#[tokio::test]
async fn test_device_management_roundtrip() {
    let registry = DeviceRegistry::new();
    let server = spawn_test_api(&registry, &ObservationStore::new()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(url(&server, "/devices"))
        .json(&json!({"instance": "p1", "host": "10.0.0.5", "port": 80}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // second add of the same instance is accepted but changes nothing
    let response = client
        .post(url(&server, "/devices"))
        .json(&json!({"instance": "p1", "host": "10.0.0.77", "port": 80}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .put(url(&server, "/devices/p1"))
        .json(&json!({"name": "desk", "instance": "p1", "host": "10.0.0.6", "port": 80}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let devices: Value = client
        .get(url(&server, "/devices"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        devices,
        json!([{"name": "desk", "instance": "p1", "host": "10.0.0.6", "port": 80}])
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_update_unknown_device_returns_not_found() {
    let registry = DeviceRegistry::new();
    registry.add(Device::new("p1", "10.0.0.5", 80)).await;
    let server = spawn_test_api(&registry, &ObservationStore::new()).await;

    let response = reqwest::Client::new()
        .put(url(&server, "/devices/ghost"))
        .json(&json!({"instance": "ghost", "host": "10.0.0.9", "port": 80}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("ghost"));
    assert_eq!(registry.list().await, vec![Device::new("p1", "10.0.0.5", 80)]);

    server.shutdown().await;
}

#[tokio::test]
async fn test_add_without_host_returns_bad_request() {
    let registry = DeviceRegistry::new();
    let server = spawn_test_api(&registry, &ObservationStore::new()).await;

    let response = reqwest::Client::new()
        .post(url(&server, "/devices"))
        .json(&json!({"instance": "p1", "host": " ", "port": 80}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(registry.is_empty().await);

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_serving() {
    let server = spawn_test_api(&DeviceRegistry::new(), &ObservationStore::new()).await;
    let health = url(&server, "/health");

    server.shutdown().await;

    assert!(reqwest::get(health).await.is_err());
}
