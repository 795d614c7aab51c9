//! Integration tests for discovery feeding the poll loop

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use shelly_exporter::{
    actors::scheduler::{Cadence, Scheduler},
    discovery::{DiscoveryService, ServiceFilter},
    observations::ObservationStore,
    registry::DeviceRegistry,
    sampler::HttpSampler,
};
use wiremock::MockServer;

use crate::helpers::*;

#[tokio::test]
async fn test_only_matching_instances_are_admitted() {
    let registry = DeviceRegistry::new();
    let browser = Arc::new(StaticBrowser::new(vec![
        advert("shellyplugsg3-8cbfea9f", "192.0.2.10"),
        advert("shellyplus1pm-aabbcc", "192.0.2.11"),
        advert("living-room-printer", "192.0.2.12"),
    ]));

    let report = discovery_with(browser, &registry)
        .discover(Duration::from_secs(1))
        .await;

    assert_eq!(report.matched, 1);
    let devices = registry.list().await;
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].instance, "shellyplugsg3-8cbfea9f");
    assert_eq!(devices[0].host, "192.0.2.10");
    assert_eq!(devices[0].port, 80);
}

#[tokio::test]
async fn test_custom_pattern_widens_the_filter() {
    let registry = DeviceRegistry::new();
    let browser = Arc::new(StaticBrowser::new(vec![
        advert("shellyplugsg3-8cbfea9f", "192.0.2.10"),
        advert("shellyplus1pm-aabbcc", "192.0.2.11"),
    ]));

    let discovery = DiscoveryService::new(
        browser,
        ServiceFilter::instance_pattern("^shelly").unwrap(),
        registry.clone(),
    );
    discovery.discover(Duration::from_secs(1)).await;

    assert_eq!(registry.count().await, 2);
}

#[tokio::test]
async fn test_discovered_device_is_sampled() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, switch_status_json(42.0, 230.0, 50.0, 0.18)).await;

    let mock_url = url::Url::parse(&mock_server.uri()).unwrap();
    let mut announced = advert("shellyplugsg3-cafe", mock_url.host_str().unwrap());
    announced.port = mock_url.port().unwrap();

    let registry = DeviceRegistry::new();
    let store = ObservationStore::new();
    let browser = Arc::new(StaticBrowser::new(vec![announced]));
    let discovery = discovery_with(browser.clone(), &registry);

    // startup scan before the loop begins
    discovery.discover(Duration::from_secs(1)).await;
    assert_eq!(browser.scans(), 1);

    let mut scheduler = Scheduler::new(
        Cadence {
            sampling: Duration::from_secs(3600),
            discovery: Duration::from_secs(3600),
        },
        registry.clone(),
        store.clone(),
        Arc::new(HttpSampler::new(Duration::from_secs(1)).unwrap()),
        discovery,
    );
    scheduler.start().unwrap();

    let report = scheduler.tick_now().await.unwrap();
    assert_eq!(report.sampled, 1);
    // discovery cadence has not elapsed yet
    assert_eq!(report.discovery, None);
    assert_eq!(browser.scans(), 1);

    assert!(
        store
            .render()
            .await
            .contains("shelly_apower_watts{instance=\"shellyplugsg3-cafe\"} 42.000000")
    );

    scheduler.stop().await;
}
