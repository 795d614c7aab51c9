use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing::level_filters::LevelFilter;
use tracing::trace;

use crate::Device;
use crate::util::parse_endpoint;

const DEFAULT_SAMPLING_INTERVAL: u64 = 30;
const DEFAULT_DISCOVERY_INTERVAL: u64 = 10 * 60;
const DEFAULT_DISCOVERY_TIMEOUT: u64 = 15;
const DEFAULT_REQUEST_TIMEOUT: u64 = 10;
const DEFAULT_INTERFACE: &str = "eth0";
const DEFAULT_SERVICE_PATTERN: &str = "shellyplugsg3";
const DEFAULT_LOG_LEVEL: &str = "error";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Address the HTTP surface listens on (`host:port` or `:port`)
    pub metrics_endpoint: Option<String>,

    /// Seconds between sampling ticks
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval: u64,

    /// Seconds between discovery scans, checked at sampling-tick boundaries
    #[serde(default = "default_discovery_interval")]
    pub discovery_interval: u64,

    /// Seconds a single discovery scan may take
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout: u64,

    /// Seconds a single device request may take
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Network interface used for mDNS discovery
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Regex matched against advertised instance names
    #[serde(default = "default_service_pattern")]
    pub service_pattern: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Devices added before discovery and polling begin
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics_endpoint: None,
            sampling_interval: default_sampling_interval(),
            discovery_interval: default_discovery_interval(),
            discovery_timeout: default_discovery_timeout(),
            request_timeout: default_request_timeout(),
            interface: default_interface(),
            service_pattern: default_service_pattern(),
            log_level: default_log_level(),
            devices: vec![],
        }
    }
}

impl Config {
    /// Replace zero and empty values with their defaults
    pub fn fill_defaults(&mut self) {
        if self.sampling_interval == 0 {
            self.sampling_interval = default_sampling_interval();
        }
        if self.discovery_interval == 0 {
            self.discovery_interval = default_discovery_interval();
        }
        if self.discovery_timeout == 0 {
            self.discovery_timeout = default_discovery_timeout();
        }
        if self.request_timeout == 0 {
            self.request_timeout = default_request_timeout();
        }
        if self.interface.trim().is_empty() {
            self.interface = default_interface();
        }
        if self.service_pattern.is_empty() {
            self.service_pattern = default_service_pattern();
        }
        if self.log_level.trim().is_empty() {
            self.log_level = default_log_level();
        }
    }

    /// The listen address, which the process cannot run without
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let endpoint = self
            .metrics_endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .context("metrics endpoint not set")?;

        parse_endpoint(endpoint)
            .with_context(|| format!("invalid metrics endpoint '{endpoint}'"))
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_secs(self.sampling_interval)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Parsed log level, falling back to debug when the value is not understood
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::DEBUG)
    }
}

fn default_sampling_interval() -> u64 {
    DEFAULT_SAMPLING_INTERVAL
}

fn default_discovery_interval() -> u64 {
    DEFAULT_DISCOVERY_INTERVAL
}

fn default_discovery_timeout() -> u64 {
    DEFAULT_DISCOVERY_TIMEOUT
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_interface() -> String {
    DEFAULT_INTERFACE.to_string()
}

fn default_service_pattern() -> String {
    DEFAULT_SERVICE_PATTERN.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read config file {path}"))?;
    let mut config: Config = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;
    config.fill_defaults();
    trace!("loaded config: {config:?}");
    Ok(config)
}
