//! Scrape text rendering
//!
//! Four gauge lines per reading, labelled by instance. Values use six
//! decimals.

use std::fmt::Write;

use crate::Reading;

pub const APOWER_WATTS: &str = "shelly_apower_watts";
pub const VOLTAGE_VOLTS: &str = "shelly_voltage_volts";
pub const CURRENT_AMPS: &str = "shelly_current_amps";
pub const FREQUENCY_HZ: &str = "shelly_frequency_hz";

/// Content type announced on the metrics endpoint
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render all readings into one scrape body
pub fn render<'a>(readings: impl IntoIterator<Item = &'a Reading>) -> String {
    let mut out = String::new();
    for reading in readings {
        write_reading(&mut out, reading);
    }
    out
}

/// Append the lines for a single reading
pub fn write_reading(out: &mut String, reading: &Reading) {
    let instance = escape_label_value(&reading.instance);

    let samples = [
        (APOWER_WATTS, reading.active_power),
        (VOLTAGE_VOLTS, reading.voltage),
        (CURRENT_AMPS, reading.current),
        (FREQUENCY_HZ, reading.frequency),
    ];

    for (metric, value) in samples {
        // writing into a String cannot fail
        let _ = writeln!(out, "{metric}{{instance=\"{instance}\"}} {value:.6}");
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
