//! Sampling a single device over its RPC endpoint
//!
//! ## Message Flow
//!
//! ```text
//! Device → GET /rpc/Switch.GetStatus?id=0 → parse JSON → Reading (stamped with capture time)
//! ```
//!
//! Failures are reported to the caller and never escalated. Transport and
//! parse failures stay distinct so they can be logged apart, but the
//! scheduler treats them the same way.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::{instrument, trace};

use crate::util::{SWITCH_STATUS_PATH, build_device_url};
use crate::{Device, Reading};

/// Why a sample produced no reading
#[derive(Debug, Error)]
pub enum SampleError {
    /// Connection refused, timeout, DNS failure or a non-success status
    #[error("sample failed for {instance}: {source}")]
    Request {
        instance: String,
        #[source]
        source: reqwest::Error,
    },

    /// The device answered with a body that is not a valid status document
    #[error("parse failed for {instance}: {source}")]
    Parse {
        instance: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SampleError {
    pub fn instance(&self) -> &str {
        match self {
            SampleError::Request { instance, .. } | SampleError::Parse { instance, .. } => {
                instance
            }
        }
    }
}

/// One request/response round trip against a device
#[async_trait]
pub trait Sampler: Send + Sync {
    async fn sample(&self, device: &Device) -> Result<Reading, SampleError>;
}

/// Electrical fields of a switch status document
///
/// Plug firmware reports `apower` and `freq`; the long names are accepted too.
/// Anything else in the body is ignored.
#[derive(Debug, Deserialize)]
struct SwitchStatus {
    #[serde(alias = "apower")]
    active_power: f64,
    voltage: f64,
    #[serde(alias = "freq")]
    frequency: f64,
    current: f64,
}

/// Parse a status body into a reading for `device`, captured now
pub fn parse_reading(device: &Device, body: &str) -> Result<Reading, SampleError> {
    let status: SwitchStatus = serde_json::from_str(body).map_err(|source| SampleError::Parse {
        instance: device.instance.clone(),
        source,
    })?;

    Ok(Reading {
        instance: device.instance.clone(),
        name: device.name.clone(),
        timestamp: Utc::now(),
        active_power: status.active_power,
        voltage: status.voltage,
        frequency: status.frequency,
        current: status.current,
    })
}

/// [`Sampler`] talking HTTP to the plug
///
/// The client is reused across requests and bounds every request by the
/// configured timeout.
#[derive(Debug, Clone)]
pub struct HttpSampler {
    client: reqwest::Client,
}

impl HttpSampler {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Sampler for HttpSampler {
    #[instrument(skip_all, fields(instance = %device.instance))]
    async fn sample(&self, device: &Device) -> Result<Reading, SampleError> {
        let url = build_device_url(&device.host, device.port, SWITCH_STATUS_PATH);
        let request_failed = |source| SampleError::Request {
            instance: device.instance.clone(),
            source,
        };

        trace!("requesting status from {url}");

        let body = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(request_failed)?
            .text()
            .await
            .map_err(request_failed)?;

        parse_reading(device, &body)
    }
}
