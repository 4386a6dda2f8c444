use std::sync::Arc;

use axum::{http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tagportal_shared::ndef::{self, UriRecord};
use tagportal_shared::nfc::BLOCK_SIZE;
use tagportal_shared::protocol::HexBytes;

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/encode", post(encode))
        .route("/decode", post(decode))
}

#[derive(Debug, Deserialize)]
pub struct EncodeRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct EncodeResponse {
    url: String,
    block: HexBytes,
    blocks: usize,
    truncated: bool,
}

/// POST /api/ndef/encode - Tag image for a URL, without touching any tag
async fn encode(
    Json(request): Json<EncodeRequest>,
) -> Result<Json<EncodeResponse>, (StatusCode, String)> {
    let record = UriRecord::from_url(&request.url);
    let block = record
        .to_block()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(EncodeResponse {
        url: record.url(),
        blocks: block.len() / BLOCK_SIZE,
        block: HexBytes(block),
        truncated: record.is_truncated(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DecodeRequest {
    pub block: String,
}

#[derive(Debug, Serialize)]
pub struct DecodeResponse {
    url: String,
}

/// POST /api/ndef/decode - URL held in a hex tag image
async fn decode(
    Json(request): Json<DecodeRequest>,
) -> Result<Json<DecodeResponse>, (StatusCode, String)> {
    let bytes = hex::decode(request.block.trim())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid hex: {}", e)))?;
    let url = ndef::decode(&bytes).map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    Ok(Json(DecodeResponse { url }))
}
