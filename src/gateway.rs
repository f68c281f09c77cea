//! HTTP surface for the chat platform bridge.
//!
//! The bridge forwards every message it sees and performs the returned
//! actions (reply, card, reaction, delete, attachment) on the platform.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::bot::{Bot, BotError};
use crate::protocol::{ActionBatch, ErrorBody, InboundMessage};

pub fn router(bot: Arc<Bot>) -> Router {
    Router::new()
        .route("/messages", post(handle_message))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(bot)
}

/// Handle one forwarded message.
///
/// POST /messages
///
/// Failures of the identity or proof services map to 502, local failures to 500.
pub async fn handle_message(
    State(bot): State<Arc<Bot>>,
    Json(message): Json<InboundMessage>,
) -> Response {
    match bot.handle(&message).await {
        Ok(actions) => Json(ActionBatch { actions }).into_response(),
        Err(e) => {
            tracing::error!("Failed to handle message {}: {}", message.message_id, e);
            let status = match &e {
                BotError::Store(_) | BotError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
                BotError::Identity(_) | BotError::Proof(_) => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
