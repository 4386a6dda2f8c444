//! JSON messages exchanged between the reader device and the server over
//! the `/ws/device` WebSocket.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::nfc::Uid;

/// Raw tag memory, carried as a hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexBytes(pub Vec<u8>);

impl TryFrom<String> for HexBytes {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        hex::decode(value.trim()).map(HexBytes)
    }
}

impl From<HexBytes> for String {
    fn from(bytes: HexBytes) -> Self {
        hex::encode_upper(bytes.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WifiMode {
    Station,
    AccessPoint,
}

impl WifiMode {
    pub fn toggled(self) -> Self {
        match self {
            WifiMode::Station => WifiMode::AccessPoint,
            WifiMode::AccessPoint => WifiMode::Station,
        }
    }
}

impl fmt::Display for WifiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WifiMode::Station => f.write_str("station"),
            WifiMode::AccessPoint => f.write_str("access point"),
        }
    }
}

/// Messages from device to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceMessage {
    /// Tag entered the field. `block` holds the URL block when the device could read it.
    TagDetected {
        uid: Uid,
        sak: Option<u8>,
        block: Option<HexBytes>,
    },
    TagRemoved,
    /// Sent on connect and after every WiFi mode change
    NetworkStatus {
        mode: WifiMode,
        ip: Ipv4Addr,
        ssid: Option<String>,
    },
    Heartbeat { uptime: u64 },
    CommandResult {
        request_id: String,
        success: bool,
        error: Option<String>,
    },
}

/// Messages from server to device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Write a tag image starting at `block_number` of the present tag
    WriteBlock {
        request_id: String,
        block_number: u8,
        block: HexBytes,
    },
    SwitchWifiMode { request_id: String, target: WifiMode },
    /// Credentials for the next station connection attempt, not persisted
    ConfigureWifi {
        request_id: String,
        ssid: String,
        password: String,
    },
    /// Text lines for the device display
    Display { lines: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_detected_wire_format() {
        let json = r#"{"type":"tag_detected","uid":"6b695bde","sak":8,"block":"d1010555046100"}"#;
        let msg: DeviceMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            DeviceMessage::TagDetected {
                uid: Uid::parse("6B695BDE").unwrap(),
                sak: Some(8),
                block: Some(HexBytes(vec![0xD1, 0x01, 0x05, 0x55, 0x04, 0x61, 0x00])),
            }
        );
    }

    #[test]
    fn test_optional_fields_may_be_omitted() {
        let json = r#"{"type":"tag_detected","uid":"C2981A06"}"#;
        let msg: DeviceMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            DeviceMessage::TagDetected {
                sak: None,
                block: None,
                ..
            }
        ));

        let json = r#"{"type":"network_status","mode":"access_point","ip":"192.168.4.1"}"#;
        let msg: DeviceMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            DeviceMessage::NetworkStatus {
                mode: WifiMode::AccessPoint,
                ip: Ipv4Addr::new(192, 168, 4, 1),
                ssid: None,
            }
        );
    }

    #[test]
    fn test_write_block_serializes_upper_hex() {
        let msg = ServerMessage::WriteBlock {
            request_id: "r1".into(),
            block_number: 4,
            block: HexBytes(vec![0xD1, 0x0a]),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "write_block");
        assert_eq!(value["block"], "D10A");
        assert_eq!(value["block_number"], 4);
    }

    #[test]
    fn test_invalid_hex_is_rejected() {
        let json = r#"{"type":"tag_detected","uid":"C2981A06","block":"xyz"}"#;
        assert!(serde_json::from_str::<DeviceMessage>(json).is_err());
    }

    #[test]
    fn test_wifi_mode_toggle() {
        assert_eq!(WifiMode::Station.toggled(), WifiMode::AccessPoint);
        assert_eq!(WifiMode::AccessPoint.toggled(), WifiMode::Station);
    }
}
