//! Tracker bridge: command dispatch and the selection state machine.
//!
//! Handles the complete event flow:
//! 1. Receive a `BotEvent` from the Telegram listener
//! 2. Resolve it against the session store (and the tracker service for
//!    follow/confirm calls) into a reply
//! 3. Perform the transport effects (send, edit in place, answer the
//!    callback query)
//!
//! Resolution is separated from transport so the state machine can be
//! tested against a mock tracker without a Telegram connection.

use crate::callback::{decode, CallbackAction};
use crate::keyboard::render;
use crate::session::{Session, SessionKey, SessionStatus, SessionStore};
use crate::telegram::{BotEvent, CallbackQuery, InlineButton, TelegramChannel};
use crate::tracker::{TrackerClient, TrackerError};
use anyhow::Result;
use regex::Regex;
use std::sync::Arc;
use tokio::sync::mpsc;

const SESSION_EXPIRED: &str = "Session expired, send /track again";
const SAVE_IN_PROGRESS: &str = "Saving selection, hold on";
const SAVE_FAILED: &str = "Failed to save, try again";
const TRACKER_DOWN: &str = "Tracker service unavailable, try again later";

/// Reply to a chat command.
#[derive(Debug, PartialEq)]
pub enum CommandReply {
    /// Plain text message
    Text(String),
    /// New message carrying a selection keyboard
    Keyboard {
        text: String,
        rows: Vec<Vec<InlineButton>>,
    },
}

/// Reply to an inline button press.
#[derive(Debug, PartialEq)]
pub enum CallbackReply {
    /// Acknowledge the press with no visible effect (stale/garbage payload)
    Ack,
    /// Short transient notice shown over the chat
    Notice(String),
    /// Edit the button message in place with a re-rendered keyboard
    UpdateKeyboard {
        text: String,
        rows: Vec<Vec<InlineButton>>,
    },
    /// Replace the button message with a final summary, clearing the keyboard
    Finalize { text: String },
}

enum ToggleOutcome {
    Toggled(Session),
    UnknownSize,
    ConfirmInFlight,
}

/// Bridges chat events to the session store and the tracker service.
pub struct TrackerBridge {
    tracker: TrackerClient,
    telegram: Arc<TelegramChannel>,
    store: Arc<SessionStore>,
}

impl TrackerBridge {
    pub fn new(
        tracker: TrackerClient,
        telegram: Arc<TelegramChannel>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            tracker,
            telegram,
            store,
        }
    }

    /// Spawn the event processor task.
    ///
    /// Each event is handled in its own task so one slow confirm call never
    /// stalls events from other chats; same-session races are resolved by
    /// the store's per-key locking.
    pub fn spawn_processor(
        bridge: Arc<Self>,
        mut rx: mpsc::Receiver<BotEvent>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Tracker bridge processor started");

            while let Some(event) = rx.recv().await {
                let bridge = bridge.clone();

                tokio::spawn(async move {
                    if let Err(e) = bridge.handle_event(event).await {
                        tracing::error!(error = %e, "Failed to handle event");
                    }
                });
            }

            tracing::info!("Tracker bridge processor stopped");
        })
    }

    /// Handle one inbound event end to end.
    pub async fn handle_event(&self, event: BotEvent) -> Result<()> {
        match event {
            BotEvent::Command { chat_id, text } => {
                let Some(reply) = self.resolve_command(chat_id, &text).await else {
                    tracing::debug!(chat_id, "Ignoring unrecognized message");
                    return Ok(());
                };

                match reply {
                    CommandReply::Text(text) => self.telegram.send_message(chat_id, &text).await?,
                    CommandReply::Keyboard { text, rows } => {
                        self.telegram
                            .send_with_inline_keyboard(chat_id, &text, &rows)
                            .await?;
                    }
                }
            }
            BotEvent::Callback(query) => self.handle_callback(query).await?,
        }

        Ok(())
    }

    async fn handle_callback(&self, query: CallbackQuery) -> Result<()> {
        let reply = self.resolve_callback(query.chat_id, &query.data).await;

        match reply {
            CallbackReply::Ack => {
                self.telegram.answer_callback_query(&query.id, None).await?;
            }
            CallbackReply::Notice(text) => {
                self.telegram
                    .answer_callback_query(&query.id, Some(&text))
                    .await?;
            }
            CallbackReply::UpdateKeyboard { text, rows } => {
                // Edit the existing message in place, never send a new one
                self.telegram
                    .edit_message_text(query.chat_id, query.message_id, &text, Some(&rows))
                    .await?;
                self.telegram.answer_callback_query(&query.id, None).await?;
            }
            CallbackReply::Finalize { text } => {
                self.telegram
                    .edit_message_text(query.chat_id, query.message_id, &text, None)
                    .await?;
                self.telegram.answer_callback_query(&query.id, None).await?;
            }
        }

        Ok(())
    }

    /// Resolve a chat command into a reply. `None` means the message is not
    /// a command the bot knows; it is ignored.
    pub async fn resolve_command(&self, chat_id: i64, text: &str) -> Option<CommandReply> {
        if let Some(captures) = Regex::new(r"^/track\s+(\S+)")
            .ok()
            .and_then(|re| re.captures(text))
        {
            let url = captures.get(1)?.as_str();
            return Some(self.track(chat_id, url).await);
        }

        if Regex::new(r"^/list\b")
            .map(|re| re.is_match(text))
            .unwrap_or(false)
        {
            return Some(self.list(chat_id).await);
        }

        None
    }

    async fn track(&self, chat_id: i64, url: &str) -> CommandReply {
        tracing::info!(chat_id, url, "Track command");

        let response = match self.tracker.follow(chat_id, url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "Tracker follow failed");
                return CommandReply::Text(TRACKER_DOWN.to_string());
            }
        };

        if response.requires_size_selection {
            if let Some(product) = response.product {
                if !response.sizes.is_empty() {
                    return self.open_selection(
                        chat_id,
                        product.product_id,
                        product.url,
                        product.name,
                        response.sizes,
                    );
                }
            }
            tracing::warn!(chat_id, url, "Tracker requested size selection without product data");
        }

        let ack = response
            .message
            .unwrap_or_else(|| format!("Tracking {url}"));
        CommandReply::Text(ack)
    }

    fn open_selection(
        &self,
        chat_id: i64,
        product_id: String,
        product_url: String,
        name: String,
        sizes: Vec<String>,
    ) -> CommandReply {
        let session = Session::new(chat_id, product_id, product_url, name.clone(), sizes);

        // Render up front so an oversized catalog identifier surfaces at
        // creation instead of on a later button press
        let rows = match render(&session) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(chat_id, product_id = %session.product_id, error = %e,
                    "Cannot encode selection buttons for product");
                return CommandReply::Text("Size selection unavailable for this product".to_string());
            }
        };

        // Supersedes any prior session for this (chat, product)
        self.store.put(session);

        CommandReply::Keyboard {
            text: format!("Select sizes for {name}"),
            rows,
        }
    }

    async fn list(&self, chat_id: i64) -> CommandReply {
        match self.tracker.list(chat_id).await {
            Ok(urls) if urls.is_empty() => CommandReply::Text("No tracked URLs yet".to_string()),
            Ok(urls) => {
                let mut text = String::from("Tracked URLs:");
                for url in urls {
                    text.push_str("\n- ");
                    text.push_str(&url);
                }
                CommandReply::Text(text)
            }
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "Tracker list failed");
                CommandReply::Text("Error fetching the list".to_string())
            }
        }
    }

    /// Resolve an inline button press into a reply.
    pub async fn resolve_callback(&self, chat_id: i64, data: &str) -> CallbackReply {
        let action = match decode(data) {
            Ok(action) => action,
            Err(e) => {
                // Stale button from a superseded session, or garbage; the
                // user sees nothing
                tracing::debug!(chat_id, error = %e, "Ignoring undecodable callback payload");
                return CallbackReply::Ack;
            }
        };

        match action {
            CallbackAction::ToggleSize { product_id, size } => {
                self.toggle(SessionKey::new(chat_id, product_id), &size)
            }
            CallbackAction::Confirm { product_id } => {
                self.confirm(SessionKey::new(chat_id, product_id)).await
            }
        }
    }

    fn toggle(&self, key: SessionKey, size: &str) -> CallbackReply {
        let outcome = self.store.mutate(&key, |session| {
            if session.status == SessionStatus::Confirming {
                // The selected set is already snapshotted for persistence;
                // rejecting beats mutating it behind the confirm's back
                return ToggleOutcome::ConfirmInFlight;
            }
            if session.toggle(size) {
                ToggleOutcome::Toggled(session.clone())
            } else {
                ToggleOutcome::UnknownSize
            }
        });

        match outcome {
            None => CallbackReply::Notice(SESSION_EXPIRED.to_string()),
            Some(ToggleOutcome::ConfirmInFlight) => {
                CallbackReply::Notice(SAVE_IN_PROGRESS.to_string())
            }
            Some(ToggleOutcome::UnknownSize) => {
                tracing::debug!(chat_id = key.chat_id, size, "Toggle for unknown size label");
                CallbackReply::Ack
            }
            Some(ToggleOutcome::Toggled(session)) => match render(&session) {
                Ok(rows) => CallbackReply::UpdateKeyboard {
                    text: format!("Select sizes for {}", session.name),
                    rows,
                },
                // Creation already validated encoding; reachable only if a
                // session was built outside open_selection
                Err(e) => {
                    tracing::error!(chat_id = key.chat_id, error = %e, "Keyboard render failed");
                    CallbackReply::Ack
                }
            },
        }
    }

    async fn confirm(&self, key: SessionKey) -> CallbackReply {
        // Snapshot under the key lock, then call the tracker without it so
        // unrelated sessions keep flowing
        let snapshot = self.store.mutate(&key, |session| {
            if session.status == SessionStatus::Confirming {
                return None;
            }
            session.status = SessionStatus::Confirming;
            Some((
                session.product_url.clone(),
                session.selected_in_order(),
                session.name.clone(),
                session.created_at(),
            ))
        });

        let (product_url, sizes, name, stamp) = match snapshot {
            None => return CallbackReply::Notice(SESSION_EXPIRED.to_string()),
            Some(None) => return CallbackReply::Notice(SAVE_IN_PROGRESS.to_string()),
            Some(Some(snapshot)) => snapshot,
        };

        match self
            .tracker
            .confirm_sizes(key.chat_id, &product_url, &sizes)
            .await
        {
            Ok(()) => {
                // Remove only the session this confirm snapshotted; a /track
                // issued mid-flight may have superseded it under the same key
                let _ = self
                    .store
                    .remove_if(&key, |session| session.created_at() == stamp);
                tracing::info!(chat_id = key.chat_id, url = %product_url, ?sizes, "Selection confirmed");

                let text = if sizes.is_empty() {
                    format!("Tracking {name} (no sizes selected)")
                } else {
                    format!("Tracking sizes: {}", sizes.join(", "))
                };
                CallbackReply::Finalize { text }
            }
            Err(e) => {
                tracing::warn!(chat_id = key.chat_id, error = %e, "Confirm failed, session retained");
                // Same buttons stay valid for a retry; leave a superseding
                // session alone
                let _ = self.store.mutate(&key, |session| {
                    if session.created_at() == stamp {
                        session.status = SessionStatus::Selecting;
                    }
                });
                CallbackReply::Notice(SAVE_FAILED.to_string())
            }
        }
    }
}
