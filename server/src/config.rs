use std::time::Duration;

use tracing::warn;

/// Server configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// How long a recognized card stays on the display
    pub display_timeout: Duration,
    /// Period of the expiry check
    pub expiry_tick: Duration,
    /// Access point name the device advertises in AP mode
    pub ap_ssid: String,
    /// Network the device joins in station mode
    pub client_ssid: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            display_timeout: Duration::from_millis(5000),
            expiry_tick: Duration::from_millis(250),
            ap_ssid: "ESP32-RFID-Reader".into(),
            client_ssid: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| match lookup(key) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warn!("Ignoring invalid {}={:?}, using {:?}", key, raw, default);
                    default
                }
            },
            None => default,
        };

        Self {
            bind_address: lookup("TAGPORTAL_BIND").unwrap_or(defaults.bind_address),
            display_timeout: millis("TAGPORTAL_DISPLAY_TIMEOUT_MS", defaults.display_timeout),
            expiry_tick: millis("TAGPORTAL_EXPIRY_TICK_MS", defaults.expiry_tick),
            ap_ssid: lookup("TAGPORTAL_AP_SSID").unwrap_or(defaults.ap_ssid),
            client_ssid: lookup("TAGPORTAL_CLIENT_SSID").unwrap_or(defaults.client_ssid),
        }
    }
}
