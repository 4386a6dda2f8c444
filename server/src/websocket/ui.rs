use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast::error::RecvError, Notify};

use crate::{api::device::DeviceStatus, display, AppState};

/// Requests a UI client may send
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum UiRequest {
    /// Resend the full state snapshot
    Refresh,
}

/// WebSocket endpoint for UI clients (browser, tablet)
pub async fn ui_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_ui_socket(socket, state))
}

/// Full snapshot of device and display, sent on connect and on request.
async fn snapshot(state: &AppState) -> String {
    let device_state = state.device_state.read().await;
    serde_json::json!({
        "type": "initial_state",
        "device": DeviceStatus::from_inner(&device_state),
        "display": display::render(&device_state)
    })
    .to_string()
}

async fn handle_ui_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so no update falls in between
    let mut rx = state.ui_broadcast.subscribe();
    let refresh = Arc::new(Notify::new());

    tracing::debug!("UI client connected");

    if sender
        .send(Message::Text(snapshot(&state).await.into()))
        .await
        .is_err()
    {
        return;
    }

    let send_task = {
        let state = state.clone();
        let refresh = refresh.clone();
        tokio::spawn(async move {
            loop {
                let text = tokio::select! {
                    received = rx.recv() => match received {
                        Ok(msg) => msg,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("UI client missed {} updates, resending state", skipped);
                            snapshot(&state).await
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = refresh.notified() => snapshot(&state).await,
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        })
    };

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<UiRequest>(&text) {
                Ok(UiRequest::Refresh) => refresh.notify_one(),
                Err(e) => tracing::debug!("Ignoring UI message: {}", e),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    tracing::debug!("UI client disconnected");
}
