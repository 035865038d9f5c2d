//! HTTP routes for the event ingress.
//!
//! External systems push notifications through `POST /event`; the bot
//! relays them to the target chat. Delivery is fire-and-forget: the
//! endpoint acknowledges immediately and failures are only logged (the
//! caller gets no delivery confirmation, a deliberate carry-over from the
//! source system - see DESIGN.md).

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::telegram::TelegramChannel;

/// Shared state for the ingress HTTP server.
pub struct BotState {
    /// Telegram channel instance (if configured)
    pub telegram: Option<Arc<TelegramChannel>>,
}

/// Create the shared server state.
pub fn create_state(telegram: Option<Arc<TelegramChannel>>) -> Arc<BotState> {
    Arc::new(BotState { telegram })
}

/// Build the ingress router.
pub fn build_router(state: Arc<BotState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/event", post(event))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct EventRequest {
    #[serde(rename = "userId")]
    user_id: i64,
    message: String,
}

#[derive(Debug, Serialize)]
struct EventResponse {
    success: bool,
    message: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "sizewatch-bot",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ready(State(state): State<Arc<BotState>>) -> impl IntoResponse {
    if state.telegram.is_none() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "not_ready",
                service: "sizewatch-bot",
                version: env!("CARGO_PKG_VERSION"),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ready",
            service: "sizewatch-bot",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Relay an external event notification to a chat.
///
/// Always acknowledges with the same fixed body; the send runs in a
/// spawned task and a failure is logged, never reported to the caller.
async fn event(
    State(state): State<Arc<BotState>>,
    Json(request): Json<EventRequest>,
) -> impl IntoResponse {
    tracing::info!(user_id = request.user_id, "Received event");

    match state.telegram {
        Some(ref telegram) => {
            let telegram = telegram.clone();
            tokio::spawn(async move {
                if let Err(e) = telegram
                    .send_message(request.user_id, &request.message)
                    .await
                {
                    tracing::error!(user_id = request.user_id, error = %e, "Event delivery failed");
                }
            });
        }
        None => {
            tracing::warn!(
                user_id = request.user_id,
                "Event received but Telegram channel is not configured"
            );
        }
    }

    Json(EventResponse {
        success: true,
        message: "Message sent",
    })
}
