//! Concurrent registry of known devices
//!
//! The registry is written by discovery, configuration seeding and the
//! management API, and read by the scheduler. It owns its lock, so callers
//! never coordinate `add` and `update` themselves.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::Device;

/// Errors surfaced by [`DeviceRegistry::update`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("device {0} not found")]
    NotFound(String),

    #[error("device {0} has no host")]
    MissingHost(String),

    #[error("device {0} has no port")]
    MissingPort(String),
}

/// Result of [`DeviceRegistry::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Appended as a new entry
    Added,

    /// An entry with the same instance exists; it was left untouched
    AlreadyKnown,

    /// Refused because the device carries no host
    MissingHost,

    /// Refused because the device carries no instance
    MissingInstance,

    /// Refused because the port is 0
    MissingPort,
}

/// Ordered collection of devices, unique by `instance`
///
/// Cloning yields another handle onto the same registry.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Arc<RwLock<Vec<Device>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a device unless it is incomplete or its instance is already known.
    ///
    /// First write wins: an existing entry is never overwritten here.
    pub async fn add(&self, device: Device) -> Admission {
        if device.instance.trim().is_empty() {
            warn!("device at {} has no instance, not adding", device.host);
            return Admission::MissingInstance;
        }
        if device.port == 0 {
            warn!("device {} has no port, not adding", device.instance);
            return Admission::MissingPort;
        }
        if !device.has_host() {
            warn!("device {} has no host, not adding", device.instance);
            return Admission::MissingHost;
        }

        let mut devices = self.devices.write().await;
        if devices.iter().any(|d| d.instance == device.instance) {
            return Admission::AlreadyKnown;
        }

        debug!("adding device {} at {}:{}", device.instance, device.host, device.port);
        devices.push(device);
        Admission::Added
    }

    /// Replace the entry with the same instance. Never creates one.
    pub async fn update(&self, device: Device) -> Result<(), RegistryError> {
        if !device.has_host() {
            return Err(RegistryError::MissingHost(device.instance));
        }
        if device.port == 0 {
            return Err(RegistryError::MissingPort(device.instance));
        }

        let mut devices = self.devices.write().await;
        match devices.iter_mut().find(|d| d.instance == device.instance) {
            Some(entry) => {
                debug!("updating device {}", device.instance);
                *entry = device;
                Ok(())
            }
            None => Err(RegistryError::NotFound(device.instance)),
        }
    }

    /// Snapshot of all devices in insertion order
    pub async fn list(&self) -> Vec<Device> {
        self.devices.read().await.clone()
    }

    pub async fn get(&self, instance: &str) -> Option<Device> {
        self.devices
            .read()
            .await
            .iter()
            .find(|d| d.instance == instance)
            .cloned()
    }

    pub async fn count(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }
}
