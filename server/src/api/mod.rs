mod cards;
pub mod device;
mod ndef;
mod tag;

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::display::{self, DisplayFrame};
use crate::AppState;

/// Build the API router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/device", device::router())
        .nest("/tag", tag::router())
        .nest("/ndef", ndef::router())
        .nest("/cards", cards::router())
        .route("/display", get(current_display))
}

/// GET /api/display - Text currently shown on the device display
async fn current_display(State(state): State<Arc<AppState>>) -> Json<DisplayFrame> {
    let device_state = state.device_state.read().await;
    Json(display::render(&device_state))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, Response};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::AppState;

    pub fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(Config::default()))
    }

    pub async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response<Body> {
        crate::build_router(state.clone()).oneshot(request).await.unwrap()
    }

    pub fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    pub fn post_request(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }
}
