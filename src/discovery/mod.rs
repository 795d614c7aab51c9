//! Device discovery through service advertisements
//!
//! A [`ServiceBrowser`] streams advertisements seen on the network. The
//! [`DiscoveryService`] bounds one scan in time, keeps the advertisements its
//! [`ServiceFilter`] accepts, and admits them into the [`DeviceRegistry`].
//!
//! ```text
//! ServiceBrowser ──AdvertisedService──▶ filter ──▶ Device ──add──▶ DeviceRegistry
//! ```
//!
//! Scans are best effort. A failing browser is logged and the scan still
//! returns. Re-running a scan is idempotent because the registry ignores
//! instances it already knows.

pub mod mdns;

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use crate::Device;
use crate::registry::{Admission, DeviceRegistry};

/// One advertisement as seen by a browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedService {
    /// Instance label, e.g. `shellyplugsg3-a0b1c2d3e4f5`
    pub instance: String,

    /// Service type label, e.g. `_http._tcp`
    pub service: String,

    pub hostname: String,

    pub addresses: Vec<Ipv4Addr>,

    pub port: u16,
}

impl AdvertisedService {
    /// The device this advertisement describes, if it has an IPv4 address
    pub fn to_device(&self) -> Option<Device> {
        let address = self.addresses.first()?;
        Some(Device {
            name: Some(self.service.clone()),
            instance: self.instance.clone(),
            host: address.to_string(),
            port: self.port,
        })
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to browse for services: {0}")]
    Browse(String),

    #[error("network interface {0} not found")]
    InterfaceNotFound(String),

    #[error("network interface {0} has no IPv4 address")]
    NoIpv4(String),
}

/// Source of advertisements
///
/// `browse` forwards every resolved advertisement to `found` until it fails or
/// the returned future is dropped. The discovery service drops it when the
/// scan window closes.
#[async_trait]
pub trait ServiceBrowser: Send + Sync {
    async fn browse(&self, found: mpsc::Sender<AdvertisedService>) -> Result<(), DiscoveryError>;
}

/// Predicate deciding which advertisements are devices
#[derive(Clone)]
pub struct ServiceFilter(Arc<dyn Fn(&AdvertisedService) -> bool + Send + Sync>);

impl ServiceFilter {
    pub fn new(predicate: impl Fn(&AdvertisedService) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Match the advertised instance label against a regex
    pub fn instance_pattern(pattern: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(pattern)?;
        Ok(Self::new(move |service| pattern.is_match(&service.instance)))
    }

    pub fn matches(&self, service: &AdvertisedService) -> bool {
        (self.0)(service)
    }
}

impl fmt::Debug for ServiceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceFilter")
    }
}

/// Outcome of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Advertisements accepted by the filter
    pub matched: usize,

    /// Devices newly added to the registry
    pub added: usize,

    /// Matches dropped for lack of an IPv4 address
    pub skipped: usize,

    /// The browser failed before the window closed
    pub failed: bool,
}

/// Bounded scans feeding the registry
#[derive(Clone)]
pub struct DiscoveryService {
    browser: Arc<dyn ServiceBrowser>,
    filter: ServiceFilter,
    registry: DeviceRegistry,
}

impl fmt::Debug for DiscoveryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryService")
            .field("filter", &self.filter)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl DiscoveryService {
    pub fn new(
        browser: Arc<dyn ServiceBrowser>,
        filter: ServiceFilter,
        registry: DeviceRegistry,
    ) -> Self {
        Self {
            browser,
            filter,
            registry,
        }
    }

    /// Scan for at most `timeout`, admitting every matching device found
    #[instrument(skip(self))]
    pub async fn discover(&self, timeout: Duration) -> DiscoveryReport {
        let before = self.registry.count().await;
        let (found_tx, mut found_rx) = mpsc::channel(64);

        let browse = async {
            match tokio::time::timeout(timeout, self.browser.browse(found_tx)).await {
                // window closed, which is the normal end of a scan
                Err(_) => false,
                Ok(Ok(())) => false,
                Ok(Err(e)) => {
                    error!("error during browsing: {e}");
                    true
                }
            }
        };

        let admit = async {
            let mut report = DiscoveryReport::default();
            while let Some(service) = found_rx.recv().await {
                if !self.filter.matches(&service) {
                    continue;
                }
                report.matched += 1;

                let Some(device) = service.to_device() else {
                    warn!(
                        "no IPv4 address found for {} ({})",
                        service.instance, service.hostname
                    );
                    report.skipped += 1;
                    continue;
                };

                debug!("found device {} at {}: {device:?}", service.instance, service.hostname);
                if self.registry.add(device).await == Admission::Added {
                    report.added += 1;
                }
            }
            report
        };

        let (failed, mut report) = tokio::join!(browse, admit);
        report.failed = failed;

        let after = self.registry.count().await;
        debug!(
            "discovered {} new devices, total {after} devices",
            after.saturating_sub(before)
        );

        report
    }
}
