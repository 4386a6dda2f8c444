//! Station / access point switching with the reader's boot fallback.

use std::net::Ipv4Addr;
use std::time::Duration;

use log::{info, warn};
use tagportal_shared::protocol::{DeviceMessage, WifiMode};

pub const MAX_STATION_ATTEMPTS: u32 = 20;
pub const ATTEMPT_DELAY: Duration = Duration::from_millis(500);

pub const STATION_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 100);
pub const AP_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);

#[derive(Debug, Clone)]
pub struct WifiSettings {
    pub ap_ssid: String,
    pub ap_password: String,
    pub client_ssid: String,
    pub client_password: String,
}

pub struct Wifi {
    pub settings: WifiSettings,
    /// Whether the simulated client network answers at all
    pub station_available: bool,
    pub attempt_delay: Duration,
    mode: WifiMode,
}

impl Wifi {
    pub fn new(settings: WifiSettings, station_available: bool) -> Self {
        Self {
            settings,
            station_available,
            attempt_delay: ATTEMPT_DELAY,
            mode: WifiMode::Station,
        }
    }

    pub fn mode(&self) -> WifiMode {
        self.mode
    }

    /// Boot sequence: station first, access point when that fails.
    pub async fn start(&mut self) -> DeviceMessage {
        if !self.connect_station().await {
            self.start_access_point();
        }
        self.status()
    }

    pub async fn switch_to(&mut self, target: WifiMode) -> DeviceMessage {
        match target {
            WifiMode::Station => self.start().await,
            WifiMode::AccessPoint => {
                self.start_access_point();
                self.status()
            }
        }
    }

    pub fn configure(&mut self, ssid: String, password: String) {
        info!("Stored station credentials for {}", ssid);
        self.settings.client_ssid = ssid;
        self.settings.client_password = password;
    }

    async fn connect_station(&mut self) -> bool {
        if self.settings.client_ssid.is_empty() {
            warn!("No station SSID configured");
            return false;
        }

        info!("Connecting as client to {}", self.settings.client_ssid);
        for attempt in 1..=MAX_STATION_ATTEMPTS {
            if self.station_available {
                info!("Connected after {} attempt(s), IP {}", attempt, STATION_IP);
                self.mode = WifiMode::Station;
                return true;
            }
            tokio::time::sleep(self.attempt_delay).await;
        }

        warn!(
            "Could not join {} after {} attempts",
            self.settings.client_ssid, MAX_STATION_ATTEMPTS
        );
        false
    }

    fn start_access_point(&mut self) {
        info!(
            "Access point {} up (password {}), IP {}",
            self.settings.ap_ssid, self.settings.ap_password, AP_IP
        );
        self.mode = WifiMode::AccessPoint;
    }

    pub fn status(&self) -> DeviceMessage {
        match self.mode {
            WifiMode::Station => DeviceMessage::NetworkStatus {
                mode: WifiMode::Station,
                ip: STATION_IP,
                ssid: Some(self.settings.client_ssid.clone()),
            },
            WifiMode::AccessPoint => DeviceMessage::NetworkStatus {
                mode: WifiMode::AccessPoint,
                ip: AP_IP,
                ssid: Some(self.settings.ap_ssid.clone()),
            },
        }
    }
}
