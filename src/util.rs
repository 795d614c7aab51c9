use std::net::{Ipv4Addr, SocketAddr};

/// Env variable consulted for the config path when no `-f` is given
pub const CONFIG_PATH_ENV: &str = "SHELLY_EXPORTER_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config.json";

pub fn get_default_config_path() -> String {
    DEFAULT_CONFIG_PATH.to_string()
}

/// RPC path answering with the switch status, including power readings
pub const SWITCH_STATUS_PATH: &str = "/rpc/Switch.GetStatus?id=0";

pub fn build_device_url(host: &str, port: u16, endpoint: &str) -> String {
    format!("http://{host}:{port}{endpoint}")
}

const DEFAULT_BIND_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

/// Parse a listen address, accepting the `:port` shorthand for all interfaces
pub fn parse_endpoint(endpoint: &str) -> Option<SocketAddr> {
    let endpoint = endpoint.trim();
    if let Some(port) = endpoint.strip_prefix(':') {
        return port
            .parse::<u16>()
            .ok()
            .map(|port| SocketAddr::from((DEFAULT_BIND_ADDR, port)));
    }
    endpoint.parse().ok()
}
