mod device;
mod ui;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

pub use device::device_ws;
pub use ui::ui_ws;

/// Build the WebSocket router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/device", axum::routing::get(device_ws))
        .route("/ui", axum::routing::get(ui_ws))
}
