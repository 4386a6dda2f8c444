use log::warn;

use crate::wifi::WifiSettings;

/// Simulator settings, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `host:port` of the TagPortal server
    pub server: String,
    pub station_available: bool,
    pub wifi: WifiSettings,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let station_available = match lookup("SIM_STATION_AVAILABLE") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    warn!(
                        "Ignoring invalid SIM_STATION_AVAILABLE={:?}, using true",
                        raw
                    );
                    true
                }
            },
            None => true,
        };

        Self {
            server: lookup("TAGPORTAL_SERVER").unwrap_or_else(|| "127.0.0.1:8080".into()),
            station_available,
            wifi: WifiSettings {
                ap_ssid: lookup("TAGPORTAL_AP_SSID").unwrap_or_else(|| "ESP32-RFID-Reader".into()),
                ap_password: lookup("TAGPORTAL_AP_PASSWORD").unwrap_or_else(|| "12345678".into()),
                client_ssid: lookup("TAGPORTAL_CLIENT_SSID").unwrap_or_default(),
                client_password: lookup("TAGPORTAL_CLIENT_PASSWORD").unwrap_or_default(),
            },
        }
    }

    pub fn device_url(&self) -> String {
        format!("ws://{}/ws/device", self.server)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]);
        assert_eq!(settings.device_url(), "ws://127.0.0.1:8080/ws/device");
        assert!(settings.station_available);
        assert_eq!(settings.wifi.ap_password, "12345678");
        assert!(settings.wifi.client_ssid.is_empty());
    }

    #[test]
    fn test_station_flag() {
        let flag = |raw: &str| settings_from(&[("SIM_STATION_AVAILABLE", raw)]).station_available;
        assert!(!flag("0"));
        assert!(!flag(" False "));
        assert!(flag("maybe"));
    }
}
