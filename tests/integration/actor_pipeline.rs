//! Integration tests for the full polling pipeline
//!
//! These tests verify that the pieces work together:
//! - Registry → Scheduler → HttpSampler → ObservationStore → exposition text
//! - Static seeding combined with discovery
//! - Graceful shutdown of the loop

use std::sync::Arc;

use pretty_assertions::assert_eq;
use shelly_exporter::{
    actors::scheduler::SchedulerState, observations::ObservationStore, registry::DeviceRegistry,
};
use wiremock::MockServer;

use crate::helpers::*;

#[tokio::test]
async fn test_reading_flows_from_device_to_exposition() {
    // Start mock plug
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, switch_status_json(12.3, 230.1, 50.0, 0.054)).await;

    let registry = DeviceRegistry::new();
    let store = ObservationStore::new();
    registry.add(device_for(&mock_server, "p1")).await;

    let mut scheduler = manual_scheduler(&registry, &store);
    scheduler.start().unwrap();

    let report = scheduler.tick_now().await.unwrap();
    assert_eq!(report.sampled, 1);
    assert_eq!(report.failed, 0);

    let text = store.render().await;
    assert_eq!(
        text,
        "shelly_apower_watts{instance=\"p1\"} 12.300000\n\
         shelly_voltage_volts{instance=\"p1\"} 230.100000\n\
         shelly_current_amps{instance=\"p1\"} 0.054000\n\
         shelly_frequency_hz{instance=\"p1\"} 50.000000\n"
    );

    // Cleanup
    scheduler.stop().await;
    assert_eq!(scheduler.state(), SchedulerState::Stopped);
}

#[tokio::test]
async fn test_each_device_sampled_once_per_tick() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_status(&first, switch_status_json(1.0, 230.0, 50.0, 0.01)).await;
    mount_status(&second, switch_status_json(2.0, 231.0, 50.0, 0.02)).await;

    let registry = DeviceRegistry::new();
    let store = ObservationStore::new();
    registry.add(device_for(&first, "plug-a")).await;
    registry.add(device_for(&second, "plug-b")).await;

    let mut scheduler = manual_scheduler(&registry, &store);
    scheduler.start().unwrap();
    scheduler.tick_now().await.unwrap();
    scheduler.tick_now().await.unwrap();

    assert_eq!(first.received_requests().await.unwrap().len(), 2);
    assert_eq!(second.received_requests().await.unwrap().len(), 2);
    assert_eq!(store.get("plug-b").await.unwrap().active_power, 2.0);

    scheduler.stop().await;
}

#[tokio::test]
async fn test_reading_carries_device_name() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, switch_status_json(3.0, 229.0, 49.9, 0.03)).await;

    let registry = DeviceRegistry::new();
    let store = ObservationStore::new();
    registry
        .add(device_for(&mock_server, "p1").with_name("desk lamp"))
        .await;

    let mut scheduler = manual_scheduler(&registry, &store);
    scheduler.start().unwrap();
    scheduler.tick_now().await.unwrap();

    assert_eq!(store.get("p1").await.unwrap().name.as_deref(), Some("desk lamp"));

    scheduler.stop().await;
}

#[tokio::test]
async fn test_static_device_not_duplicated_by_discovery() {
    let registry = DeviceRegistry::new();
    registry
        .add(shelly_exporter::Device::new("shellyplugsg3-a", "10.0.0.5", 80))
        .await;

    let browser = Arc::new(StaticBrowser::new(vec![advert(
        "shellyplugsg3-a",
        "10.0.0.99",
    )]));
    let report = discovery_with(browser.clone(), &registry)
        .discover(std::time::Duration::from_secs(1))
        .await;

    assert_eq!(report.matched, 1);
    assert_eq!(report.added, 0);
    assert_eq!(registry.count().await, 1);
    // the seeded host wins
    assert_eq!(registry.get("shellyplugsg3-a").await.unwrap().host, "10.0.0.5");
}

#[tokio::test]
async fn test_shutdown_waits_for_loop() {
    let registry = DeviceRegistry::new();
    let store = ObservationStore::new();

    let mut scheduler = manual_scheduler(&registry, &store);
    scheduler.start().unwrap();

    let report = scheduler.tick_now().await.unwrap();
    assert_eq!(report.devices, 0);

    scheduler.stop().await;
    scheduler.stop().await;

    assert_eq!(scheduler.state(), SchedulerState::Stopped);
    assert!(scheduler.tick_now().await.is_err());
}
