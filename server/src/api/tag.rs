use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tagportal_shared::ndef::UriRecord;
use tagportal_shared::nfc::URL_BLOCK;
use tagportal_shared::protocol::{HexBytes, ServerMessage};

use crate::api::device::{send_command, unavailable};
use crate::session::TagSnapshot;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(current_tag))
        .route("/ndef", post(write_ndef))
}

/// GET /api/tag - Tag currently in the reader field
async fn current_tag(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TagSnapshot>, (StatusCode, String)> {
    let device_state = state.device_state.read().await;
    device_state
        .present_tag
        .clone()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "No tag present".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct WriteNdefRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WriteNdefResponse {
    request_id: String,
    /// URL as it will read back from the tag
    url: String,
    block: HexBytes,
    truncated: bool,
}

/// POST /api/tag/ndef - Write a URL record to the present tag
async fn write_ndef(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WriteNdefRequest>,
) -> Result<(StatusCode, Json<WriteNdefResponse>), (StatusCode, String)> {
    let record = UriRecord::from_url(&request.url);
    let block = record
        .to_block()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let request_id = uuid::Uuid::new_v4().to_string();

    {
        let mut device_state = state.device_state.write().await;
        if !device_state.connected {
            return Err(unavailable("Device not connected"));
        }
        let Some(tag) = &device_state.present_tag else {
            return Err((StatusCode::BAD_REQUEST, "No tag present".into()));
        };
        tracing::info!("Writing {} to tag {}", record.url(), tag.uid);
        // Registered before sending so the device's result always finds it
        device_state
            .pending_writes
            .insert(request_id.clone(), block.clone());
    }

    let command = ServerMessage::WriteBlock {
        request_id: request_id.clone(),
        block_number: URL_BLOCK,
        block: HexBytes(block.clone()),
    };
    if let Err(e) = send_command(&state, command).await {
        let mut device_state = state.device_state.write().await;
        device_state.pending_writes.remove(&request_id);
        return Err(e);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(WriteNdefResponse {
            request_id,
            url: record.url(),
            block: HexBytes(block),
            truncated: record.is_truncated(),
        }),
    ))
}
