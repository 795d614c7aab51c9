//! Prometheus exporter for Shelly Plug S Gen3 smart plugs.
//!
//! Devices are seeded from configuration and discovered over mDNS, sampled on a
//! fixed cadence through their RPC endpoint, and the latest reading per device
//! is served as scrape text.
//!
//! ```text
//! DiscoveryService ──add──▶ DeviceRegistry ◀──update── api (management)
//!                                 │ list
//!                                 ▼
//!                   Scheduler ──▶ Sampler ──▶ ObservationStore ──▶ api (/metrics)
//! ```

pub mod actors;
pub mod api;
pub mod config;
pub mod discovery;
pub mod exposition;
pub mod observations;
pub mod registry;
pub mod sampler;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A metering device known to the exporter, keyed by `instance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Informational only, never used for correlation
    #[serde(default)]
    pub name: Option<String>,

    pub instance: String,

    /// IPv4 literal. Missing hosts deserialize as empty and are refused on admission.
    #[serde(default, alias = "ip")]
    pub host: String,

    pub port: u16,
}

impl Device {
    pub fn new(instance: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: None,
            instance: instance.into(),
            host: host.into(),
            port,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn has_host(&self) -> bool {
        !self.host.trim().is_empty()
    }
}

/// Snapshot of one device's electrical state at a capture instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub instance: String,
    pub name: Option<String>,

    /// When the exporter captured the sample, never taken from the device
    pub timestamp: DateTime<Utc>,

    /// Watts
    pub active_power: f64,
    /// Volts
    pub voltage: f64,
    /// Hertz
    pub frequency: f64,
    /// Amperes
    pub current: f64,
}
