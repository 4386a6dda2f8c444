use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tagportal_shared::protocol::{DeviceMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::{display, session::NetworkStatus, AppState};

/// WebSocket endpoint for device connection
pub async fn device_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_device_socket(socket, state))
}

async fn handle_device_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Create command channel
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<ServerMessage>(32);

    // Mark device as connected
    {
        let mut device_state = state.device_state.write().await;
        if device_state.connected {
            tracing::warn!("Replacing the previous device connection");
        }
        device_state.connected = true;
        device_state.command_tx = Some(cmd_tx.clone());
    }

    tracing::info!("Device connected");

    // Broadcast device connected to UI
    let _ = state.ui_broadcast.send(
        serde_json::json!({
            "type": "device_connected"
        })
        .to_string(),
    );

    // Task for sending commands to device
    let send_task = tokio::spawn(async move {
        while let Some(msg) = cmd_rx.recv().await {
            let json = serde_json::to_string(&msg).unwrap_or_default();
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    display::publish(&state).await;

    // Process incoming messages
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<DeviceMessage>(&text) {
                Ok(device_msg) => {
                    handle_device_message(&state, device_msg).await;
                }
                Err(e) => {
                    tracing::warn!("Invalid device message: {}", e);
                }
            }
        }
    }

    // Cleanup on disconnect
    send_task.abort();

    {
        let mut device_state = state.device_state.write().await;
        let still_ours = device_state
            .command_tx
            .as_ref()
            .is_some_and(|tx| tx.same_channel(&cmd_tx));
        if still_ours {
            device_state.disconnected();
        }
    }

    tracing::info!("Device disconnected");

    // Broadcast device disconnected to UI
    let _ = state.ui_broadcast.send(
        serde_json::json!({
            "type": "device_disconnected"
        })
        .to_string(),
    );
}

async fn handle_device_message(state: &Arc<AppState>, msg: DeviceMessage) {
    match msg {
        DeviceMessage::TagDetected { uid, sak, block } => {
            tracing::info!("Tag detected: {}", uid);

            let snapshot = {
                let mut device_state = state.device_state.write().await;
                device_state.tag_detected(uid, sak, block.map(|b| b.0), Instant::now())
            };

            let _ = state.ui_broadcast.send(
                serde_json::json!({
                    "type": "tag_detected",
                    "tag": snapshot
                })
                .to_string(),
            );

            display::publish(state).await;
        }

        DeviceMessage::TagRemoved => {
            tracing::info!("Tag removed");

            state.device_state.write().await.tag_removed();

            let _ = state.ui_broadcast.send(
                serde_json::json!({
                    "type": "tag_removed"
                })
                .to_string(),
            );
        }

        DeviceMessage::NetworkStatus { mode, ip, ssid } => {
            tracing::info!("Device network: {} mode, IP {}", mode, ip);

            let network = NetworkStatus {
                mode,
                ip: Some(ip),
                ssid,
            };
            state.device_state.write().await.set_network(network.clone());

            let _ = state.ui_broadcast.send(
                serde_json::json!({
                    "type": "network_status",
                    "network": network
                })
                .to_string(),
            );

            display::publish(state).await;
        }

        DeviceMessage::Heartbeat { uptime } => {
            tracing::debug!("Device heartbeat: {}s uptime", uptime);
            state.device_state.write().await.uptime = Some(uptime);
        }

        DeviceMessage::CommandResult {
            request_id,
            success,
            error,
        } => {
            {
                let mut device_state = state.device_state.write().await;
                let pending = device_state.pending_writes.remove(&request_id);
                match (pending, success) {
                    (Some(block), true) => device_state.block_written(block),
                    (Some(_), false) => {
                        tracing::warn!("Tag write {} failed: {:?}", request_id, error)
                    }
                    (None, true) => tracing::debug!("Command {} succeeded", request_id),
                    (None, false) => {
                        tracing::warn!("Command {} failed: {:?}", request_id, error)
                    }
                }
            }

            let _ = state.ui_broadcast.send(
                serde_json::json!({
                    "type": "command_result",
                    "request_id": request_id,
                    "success": success,
                    "error": error
                })
                .to_string(),
            );
        }
    }
}
