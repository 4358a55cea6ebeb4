//! HTTP routes.

pub mod bot;
pub mod health;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the API router.
///
/// `/api/bot` and `/api/status` answer preflight `OPTIONS` with an empty
/// 200 and any other unrouted method with a JSON 405.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/bot",
            get(bot::status)
                .post(bot::control)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/status",
            get(bot::status)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health::health))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "Method not allowed" })),
    )
}
