//! Bot control and status endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use pb_sessions::{IdentityKey, StartOutcome};

use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /api/bot
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct BotRequest {
    #[serde(default)]
    pub action: Option<String>,
    /// Phone number with country code; a JSON string or number.
    #[serde(default, rename = "phoneNumber")]
    pub phone_number: Option<Value>,
}

enum Action {
    Start(IdentityKey),
    Stop(IdentityKey),
}

impl BotRequest {
    fn action(&self) -> Option<Action> {
        let raw = match self.phone_number.as_ref()? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let key = IdentityKey::parse(&raw).ok()?;
        match self.action.as_deref()? {
            "start" => Some(Action::Start(key)),
            "stop" => Some(Action::Stop(key)),
            _ => None,
        }
    }
}

/// Start or stop the bot for a phone number.
pub async fn control(
    State(state): State<AppState>,
    body: Result<Json<BotRequest>, JsonRejection>,
) -> Response {
    let action = match body {
        Ok(Json(req)) => req.action(),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected bot request body");
            None
        }
    };

    match action {
        Some(Action::Start(key)) => start(&state, key).await,
        Some(Action::Stop(key)) => stop(&state, key).await,
        None => invalid_request(),
    }
}

async fn start(state: &AppState, key: IdentityKey) -> Response {
    match state.lifecycle.start(&key).await {
        Ok(StartOutcome::AlreadyReady) => Json(json!({
            "status": "already_connected",
            "message": "Bot is already connected for this number",
        }))
        .into_response(),
        Ok(StartOutcome::PairingRequired { artifact }) => Json(json!({
            "status": "qr_required",
            "qr": artifact,
            "message": "Scan the QR code to connect WhatsApp",
        }))
        .into_response(),
        Ok(StartOutcome::Initializing) => Json(json!({
            "status": "initializing",
            "message": "Initializing WhatsApp client...",
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(session_key = %key, error = %e, "failed to start bot");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": format!("Failed to start bot: {e}"),
                })),
            )
                .into_response()
        }
    }
}

async fn stop(state: &AppState, key: IdentityKey) -> Response {
    if state.lifecycle.stop(&key).await {
        Json(json!({
            "status": "stopped",
            "message": "Bot stopped for this number",
        }))
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "status": "error",
                "message": "No bot running for this number",
            })),
        )
            .into_response()
    }
}

fn invalid_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Invalid request" })),
    )
        .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /api/bot, GET /api/status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Snapshot of every live session.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "success",
        "clients": state.sessions.snapshot(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(v: Value) -> BotRequest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn numeric_phone_is_accepted() {
        let r = req(json!({ "action": "start", "phoneNumber": 15551234567u64 }));
        assert!(matches!(r.action(), Some(Action::Start(k)) if k.as_str() == "15551234567"));
    }

    #[test]
    fn unknown_action_or_bad_phone_is_invalid() {
        assert!(req(json!({ "action": "restart", "phoneNumber": "1555" }))
            .action()
            .is_none());
        assert!(req(json!({ "action": "start", "phoneNumber": "" }))
            .action()
            .is_none());
        assert!(req(json!({ "action": "start" })).action().is_none());
        assert!(req(json!({ "phoneNumber": "1555" })).action().is_none());
        assert!(req(json!({ "action": "start", "phoneNumber": ["1555"] }))
            .action()
            .is_none());
    }

    #[test]
    fn stop_action_parses() {
        let r = req(json!({ "action": "stop", "phoneNumber": "+1555" }));
        assert!(matches!(r.action(), Some(Action::Stop(_))));
    }
}
