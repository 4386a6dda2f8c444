//! Text frame for the device's 128x64 OLED.
//!
//! The display fits 8 rows of 21 characters at text size 1. Long lines wrap
//! onto the next row, rows past the bottom are dropped.

use serde::Serialize;
use tagportal_shared::protocol::{ServerMessage, WifiMode};

use crate::session::DeviceStateInner;
use crate::AppState;

pub const COLUMNS: usize = 21;
pub const ROWS: usize = 8;
const URL_PREVIEW_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayFrame {
    pub lines: Vec<String>,
}

pub fn render(inner: &DeviceStateInner) -> DisplayFrame {
    let mode = match inner.network.mode {
        WifiMode::AccessPoint => "AP",
        WifiMode::Station => "Client",
    };

    let mut text = vec![
        "RFID Reader".to_string(),
        "------------------".to_string(),
        format!("Mode: {mode}"),
        inner.message.clone(),
    ];

    if let Some(active) = &inner.active_card {
        let preview: String = active.card.url.chars().take(URL_PREVIEW_CHARS).collect();
        text.push(format!("URL: {preview}..."));
        let ip = inner
            .network
            .ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "-".into());
        text.push(format!("IP: {ip}"));
    }

    let lines = text.iter().flat_map(|line| wrap(line)).take(ROWS).collect();
    DisplayFrame { lines }
}

fn wrap(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(COLUMNS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Pushes the current frame to the device and to UI clients.
pub async fn publish(state: &AppState) {
    let (frame, command_tx) = {
        let inner = state.device_state.read().await;
        (render(&inner), inner.command_tx.clone())
    };

    if let Some(tx) = command_tx {
        let _ = tx
            .send(ServerMessage::Display {
                lines: frame.lines.clone(),
            })
            .await;
    }

    let _ = state.ui_broadcast.send(
        serde_json::json!({
            "type": "display",
            "lines": frame.lines
        })
        .to_string(),
    );
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use tagportal_shared::nfc::Uid;
    use tokio::time::Instant;

    use super::*;
    use crate::session::NetworkStatus;

    #[test]
    fn test_idle_frame() {
        let inner = DeviceStateInner::default();
        assert_eq!(
            render(&inner).lines,
            vec!["RFID Reader", "------------------", "Mode: Client", "Client mode active"]
        );
    }

    #[test]
    fn test_active_card_frame_shows_url_preview_and_ip() {
        let mut inner = DeviceStateInner::default();
        inner.set_network(NetworkStatus {
            mode: WifiMode::AccessPoint,
            ip: Some(Ipv4Addr::new(192, 168, 4, 1)),
            ssid: None,
        });
        inner.tag_detected(Uid::parse("6B695BDE").unwrap(), None, None, Instant::now());

        let frame = render(&inner);
        assert_eq!(frame.lines[2], "Mode: AP");
        assert_eq!(frame.lines[3], "Access: ESEIAAT UPC");
        // "URL: https://eseiaat...." is 23 characters and wraps
        assert_eq!(frame.lines[4], "URL: https://eseiaat.");
        assert_eq!(frame.lines[5], "..");
        assert_eq!(frame.lines[6], "IP: 192.168.4.1");
    }

    #[test]
    fn test_frame_never_exceeds_display() {
        let mut inner = DeviceStateInner::default();
        inner.message = "x".repeat(200);
        let frame = render(&inner);
        assert_eq!(frame.lines.len(), ROWS);
        for line in &frame.lines {
            assert!(line.chars().count() <= COLUMNS, "{line}");
        }
    }
}
