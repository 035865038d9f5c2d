//! Sizewatch bot - Telegram front end for the product tracker.
//!
//! Lets a user track a product URL from chat. When the tracker service
//! reports that a product comes in sizes, the bot opens an interactive
//! selection: an inline keyboard with one toggle button per size plus a
//! Confirm button, edited in place as the user picks.
//!
//! ## Architecture
//!
//! ```text
//! Telegram ── long poll ──> TelegramChannel ── BotEvent ──> TrackerBridge
//!                                                               │
//!                              SessionStore <── toggle/confirm ─┤
//!                                                               │
//! Tracker service <──────────── follow / confirm sizes ─────────┘
//!
//! External events ──> POST /event ──> TelegramChannel ──> user chat
//! ```
//!
//! The session store is the only shared mutable state; the callback codec
//! and the keyboard renderer are pure.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod bridge;
pub mod callback;
pub mod keyboard;
pub mod routes;
pub mod session;
pub mod telegram;
pub mod tracker;

// Re-export commonly used types
pub use bridge::{CallbackReply, CommandReply, TrackerBridge};
pub use callback::{decode, encode, CallbackAction, DecodeError, EncodeError, MAX_CALLBACK_BYTES};
pub use keyboard::render;
pub use routes::{build_router, create_state, BotState};
pub use session::{Session, SessionKey, SessionStatus, SessionStore};
pub use telegram::{BotEvent, CallbackQuery, InlineButton, TelegramChannel};
pub use tracker::{FollowProduct, FollowResponse, TrackerClient, TrackerError};

use sizewatch_common::Config;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

/// Start the bot: Telegram listener, event processor, session sweep, and
/// the ingress HTTP server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let telegram = if config.telegram.bot_token.is_empty() {
        tracing::warn!("No Telegram bot token configured; chat features disabled");
        None
    } else {
        let channel = Arc::new(TelegramChannel::new(
            config.telegram.bot_token.clone(),
            config.telegram.poll_timeout_secs,
        ));
        channel.init().await?;
        Some(channel)
    };

    let store = Arc::new(SessionStore::new());

    if let Some(ref telegram) = telegram {
        let tracker = TrackerClient::new(
            config.tracker.endpoint.clone(),
            Duration::from_secs(config.tracker.timeout_secs),
        );
        let bridge = Arc::new(TrackerBridge::new(tracker, telegram.clone(), store.clone()));

        let (tx, rx) = mpsc::channel(64);
        TrackerBridge::spawn_processor(bridge, rx);

        let listener_channel = telegram.clone();
        tokio::spawn(async move {
            listener_channel.listen(tx).await;
        });
    }

    // Periodic eviction so abandoned selections do not accumulate forever
    let sweep_store = store.clone();
    let ttl = Duration::from_secs(config.session.ttl_secs);
    let sweep_interval = Duration::from_secs(config.session.sweep_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let removed = sweep_store.sweep_expired(ttl);
            if removed > 0 {
                tracing::info!(removed, "Evicted expired selection sessions");
            }
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = create_state(telegram);
    let router = build_router(state).layer(cors);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    tracing::info!("Starting Sizewatch bot API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
