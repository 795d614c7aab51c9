//! mDNS browser bound to a single network interface
//!
//! The interface is picked once at startup and never changes. Advertisements
//! for `_http._tcp.local.` are forwarded as they resolve.

use std::net::IpAddr;

use async_trait::async_trait;
use mdns_sd::{IfKind, ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::{AdvertisedService, DiscoveryError, ServiceBrowser};

/// Service type plugs announce their HTTP API under
pub const SERVICE_TYPE: &str = "_http._tcp.local.";

/// Check that `name` exists and carries an IPv4 address
pub fn check_interface(name: &str) -> Result<(), DiscoveryError> {
    let interfaces =
        if_addrs::get_if_addrs().map_err(|e| DiscoveryError::Browse(e.to_string()))?;

    let mut matching = interfaces.iter().filter(|iface| iface.name == name).peekable();
    if matching.peek().is_none() {
        return Err(DiscoveryError::InterfaceNotFound(name.to_string()));
    }
    if !matching.any(|iface| iface.ip().is_ipv4()) {
        return Err(DiscoveryError::NoIpv4(name.to_string()));
    }
    Ok(())
}

pub struct MdnsBrowser {
    daemon: ServiceDaemon,
    interface: String,
}

impl MdnsBrowser {
    /// Start a resolver that only listens on `interface`
    pub fn on_interface(interface: &str) -> Result<Self, DiscoveryError> {
        check_interface(interface)?;

        let daemon = ServiceDaemon::new().map_err(browse_error)?;
        daemon.disable_interface(IfKind::All).map_err(browse_error)?;
        daemon
            .enable_interface(IfKind::Name(interface.to_string()))
            .map_err(browse_error)?;

        debug!("mDNS resolver bound to {interface}");

        Ok(Self {
            daemon,
            interface: interface.to_string(),
        })
    }
}

impl Drop for MdnsBrowser {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.shutdown() {
            warn!("failed to shut down mDNS daemon: {e}");
        }
    }
}

/// Stops the browse when a scan is dropped at the end of its window
struct BrowseGuard<'a>(&'a ServiceDaemon);

impl Drop for BrowseGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.0.stop_browse(SERVICE_TYPE) {
            trace!("stop_browse: {e}");
        }
    }
}

#[async_trait]
impl ServiceBrowser for MdnsBrowser {
    async fn browse(&self, found: mpsc::Sender<AdvertisedService>) -> Result<(), DiscoveryError> {
        debug!("browsing for {SERVICE_TYPE} on {}", self.interface);
        let events = self.daemon.browse(SERVICE_TYPE).map_err(browse_error)?;
        let _guard = BrowseGuard(&self.daemon);

        loop {
            let event = events
                .recv_async()
                .await
                .map_err(|e| DiscoveryError::Browse(e.to_string()))?;

            if let ServiceEvent::ServiceResolved(info) = event {
                trace!("resolved {}", info.get_fullname());
                if found.send(advertised(&info)).await.is_err() {
                    // nobody is listening anymore
                    return Ok(());
                }
            }
        }
    }
}

fn browse_error(e: mdns_sd::Error) -> DiscoveryError {
    DiscoveryError::Browse(e.to_string())
}

fn advertised(info: &ServiceInfo) -> AdvertisedService {
    let (instance, service) = split_fullname(info.get_fullname(), info.get_type());

    let mut addresses: Vec<_> = info
        .get_addresses()
        .iter()
        .filter_map(|addr| match addr {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
        .collect();
    addresses.sort();

    AdvertisedService {
        instance,
        service,
        hostname: info.get_hostname().to_string(),
        addresses,
        port: info.get_port(),
    }
}

/// Split `instance._http._tcp.local.` into the instance and service labels
fn split_fullname(fullname: &str, ty_domain: &str) -> (String, String) {
    let instance = fullname
        .strip_suffix(ty_domain)
        .unwrap_or(fullname)
        .trim_end_matches('.');
    let service = ty_domain
        .trim_end_matches('.')
        .trim_end_matches(".local");

    (instance.to_string(), service.to_string())
}
