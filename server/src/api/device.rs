use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tagportal_shared::protocol::ServerMessage;

use crate::session::{CardView, DeviceStateInner, NetworkStatus, TagSnapshot};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(device_status))
}

#[derive(Debug, Serialize)]
pub struct DeviceStatus {
    connected: bool,
    network: NetworkStatus,
    message: String,
    uptime: Option<u64>,
    present_tag: Option<TagSnapshot>,
    active_card: Option<CardView>,
}

impl DeviceStatus {
    pub fn from_inner(inner: &DeviceStateInner) -> Self {
        Self {
            connected: inner.connected,
            network: inner.network.clone(),
            message: inner.message.clone(),
            uptime: inner.uptime,
            present_tag: inner.present_tag.clone(),
            active_card: inner.active_card_view(),
        }
    }
}

/// GET /api/device/status - Get device connection status
async fn device_status(State(state): State<Arc<AppState>>) -> Json<DeviceStatus> {
    let device_state = state.device_state.read().await;
    Json(DeviceStatus::from_inner(&device_state))
}

pub(crate) fn unavailable(reason: &str) -> (StatusCode, String) {
    (StatusCode::SERVICE_UNAVAILABLE, reason.to_string())
}

/// Queues a command for the connected device.
pub async fn send_command(
    state: &AppState,
    msg: ServerMessage,
) -> Result<(), (StatusCode, String)> {
    let command_tx = {
        let device_state = state.device_state.read().await;
        if !device_state.connected {
            return Err(unavailable("Device not connected"));
        }
        device_state.command_tx.clone()
    };

    let tx = command_tx.ok_or_else(|| unavailable("Device not connected"))?;
    tx.send(msg)
        .await
        .map_err(|_e| unavailable("Device connection closed"))
}

#[cfg(test)]
mod tests {
    use tagportal_shared::protocol::WifiMode;

    use super::*;
    use crate::api::test_support::*;

    #[tokio::test]
    async fn test_status_of_disconnected_device() {
        let state = test_state();
        let response = send(&state, get_request("/api/device/status")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["connected"], false);
        assert_eq!(json["network"]["mode"], "station");
        assert!(json["present_tag"].is_null());
    }

    #[tokio::test]
    async fn test_send_command_requires_device() {
        let state = test_state();
        let result = send_command(
            &state,
            ServerMessage::SwitchWifiMode {
                request_id: "r".into(),
                target: WifiMode::AccessPoint,
            },
        )
        .await;
        assert_eq!(result.unwrap_err().0, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_send_command_reaches_channel() {
        let state = test_state();
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        {
            let mut inner = state.device_state.write().await;
            inner.connected = true;
            inner.command_tx = Some(tx);
        }

        let display = ServerMessage::Display {
            lines: vec!["hi".into()],
        };
        send_command(&state, display.clone()).await.unwrap();
        assert_eq!(rx.recv().await, Some(display));
    }
}
