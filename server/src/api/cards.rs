use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tagportal_shared::cards;

use crate::session::CardView;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_cards))
}

/// GET /api/cards - Known cards
async fn list_cards() -> Json<Vec<CardView>> {
    Json(
        cards::all()
            .iter()
            .enumerate()
            .map(|(index, card)| CardView::new(index, card))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_support::*;

    #[tokio::test]
    async fn test_list_cards_includes_index() {
        let state = test_state();
        let response = send(&state, get_request("/api/cards")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.as_array().map(Vec::len), Some(4));
        assert_eq!(json[2]["index"], 2);
        assert_eq!(json[2]["url"], "https://github.com/mauricioudsx");
    }
}
