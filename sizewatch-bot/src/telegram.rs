//! Telegram transport.
//!
//! Thin wrapper over the Bot API: sending and editing messages, answering
//! callback queries, and a long-poll loop that turns raw updates into typed
//! [`BotEvent`]s for the bridge processor. No business state lives here.

use anyhow::Result;
use serde::Deserialize;
use tokio::sync::mpsc;

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Callback query received when a user presses an inline button.
#[derive(Debug, Clone)]
pub struct CallbackQuery {
    /// Query id, needed to answer the press
    pub id: String,
    /// Chat the button message lives in
    pub chat_id: i64,
    /// Message carrying the keyboard
    pub message_id: i64,
    /// Opaque payload attached to the button
    pub data: String,
}

/// Inbound event delivered by the long-poll loop.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// A text message from a chat
    Command { chat_id: i64, text: String },
    /// An inline button press
    Callback(CallbackQuery),
}

// ============================================================================
// Update wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<IncomingMessage>,
    callback_query: Option<IncomingCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    message_id: i64,
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct IncomingCallbackQuery {
    id: String,
    data: Option<String>,
    message: Option<IncomingMessage>,
}

// ============================================================================
// Telegram channel
// ============================================================================

/// Telegram channel - long-polls the Bot API for updates.
pub struct TelegramChannel {
    bot_token: String,
    poll_timeout_secs: u64,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, poll_timeout_secs: u64) -> Self {
        Self {
            bot_token,
            poll_timeout_secs,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Verify the bot token by calling `getMe`.
    pub async fn init(&self) -> Result<()> {
        let resp = self.client.get(self.api_url("getMe")).send().await?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("Invalid bot token: {err}");
        }

        tracing::info!("Telegram channel initialized");
        Ok(())
    }

    /// Send a plain text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram sendMessage failed: {err}");
        }

        Ok(())
    }

    /// Send a message with inline keyboard buttons, returning its message id.
    pub async fn send_with_inline_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Vec<InlineButton>],
    ) -> Result<i64> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": {
                "inline_keyboard": keyboard_json(buttons)
            }
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram sendMessage with keyboard failed: {err}");
        }

        let data: serde_json::Value = resp.json().await?;
        let message_id = data
            .get("result")
            .and_then(|r| r.get("message_id"))
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("Missing message_id in response"))?;

        Ok(message_id)
    }

    /// Edit an existing message in place.
    ///
    /// With `buttons` the keyboard is replaced; without, Telegram drops the
    /// keyboard entirely, which is how a finished selection is closed out.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        buttons: Option<&[Vec<InlineButton>]>,
    ) -> Result<()> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });

        if let Some(buttons) = buttons {
            body["reply_markup"] = serde_json::json!({
                "inline_keyboard": keyboard_json(buttons)
            });
        }

        let resp = self
            .client
            .post(self.api_url("editMessageText"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram editMessageText failed: {err}");
        }

        Ok(())
    }

    /// Answer a callback query, clearing the button spinner.
    ///
    /// With `text` the user sees a short transient notice; without, the
    /// press is acknowledged with no visible effect.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<()> {
        let mut body = serde_json::json!({
            "callback_query_id": callback_query_id,
        });

        if let Some(t) = text {
            body["text"] = serde_json::Value::String(t.to_string());
        }

        let resp = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram answerCallbackQuery failed: {err}");
        }

        Ok(())
    }

    /// Long-poll `getUpdates` and forward typed events to `tx`.
    ///
    /// Runs until the receiving side is dropped. Poll and parse errors are
    /// logged and retried after a short sleep.
    pub async fn listen(&self, tx: mpsc::Sender<BotEvent>) {
        let mut offset: i64 = 0;

        tracing::info!("Telegram channel listening for updates...");

        loop {
            let body = serde_json::json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            });

            let resp = match self
                .client
                .post(self.api_url("getUpdates"))
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Telegram poll error: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            let updates: UpdatesResponse = match resp.json().await {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!("Telegram parse error: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates.result {
                offset = offset.max(update.update_id + 1);

                let Some(event) = event_from_update(update) else {
                    continue;
                };

                if tx.send(event).await.is_err() {
                    tracing::info!("Event receiver dropped, stopping Telegram listener");
                    return;
                }
            }
        }
    }
}

/// Convert one raw update into a typed event, dropping everything else
/// (stickers, photos, callback queries with no payload, ...).
fn event_from_update(update: Update) -> Option<BotEvent> {
    if let Some(query) = update.callback_query {
        let message = query.message?;
        return Some(BotEvent::Callback(CallbackQuery {
            id: query.id,
            chat_id: message.chat.id,
            message_id: message.message_id,
            data: query.data?,
        }));
    }

    let message = update.message?;
    let text = message.text?;
    Some(BotEvent::Command {
        chat_id: message.chat.id,
        text,
    })
}

fn keyboard_json(buttons: &[Vec<InlineButton>]) -> Vec<Vec<serde_json::Value>> {
    buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|btn| {
                    serde_json::json!({
                        "text": btn.text,
                        "callback_data": btn.callback_data,
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_includes_token() {
        let ch = TelegramChannel::new("123:ABC".into(), 30);
        assert_eq!(
            ch.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
    }

    #[test]
    fn keyboard_json_shape() {
        let rows = vec![
            vec![InlineButton::new("⬜ M", "sz|p1|M")],
            vec![InlineButton::new("Confirm", "ok|p1")],
        ];
        let json = keyboard_json(&rows);
        assert_eq!(json.len(), 2);
        assert_eq!(json[0][0]["text"], "⬜ M");
        assert_eq!(json[0][0]["callback_data"], "sz|p1|M");
        assert_eq!(json[1][0]["callback_data"], "ok|p1");
    }

    #[test]
    fn event_from_text_message() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "chat": { "id": 42 },
                "text": "/track https://example.com/item"
            }
        }))
        .unwrap();

        match event_from_update(update) {
            Some(BotEvent::Command { chat_id, text }) => {
                assert_eq!(chat_id, 42);
                assert_eq!(text, "/track https://example.com/item");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn event_from_callback_query() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 11,
            "callback_query": {
                "id": "cb-1",
                "data": "sz|p1|M",
                "message": {
                    "message_id": 7,
                    "chat": { "id": 42 }
                }
            }
        }))
        .unwrap();

        match event_from_update(update) {
            Some(BotEvent::Callback(query)) => {
                assert_eq!(query.chat_id, 42);
                assert_eq!(query.message_id, 7);
                assert_eq!(query.data, "sz|p1|M");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn non_text_updates_are_dropped() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 12,
            "message": {
                "message_id": 2,
                "chat": { "id": 42 }
            }
        }))
        .unwrap();
        assert!(event_from_update(update).is_none());

        // Callback query without a payload
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 13,
            "callback_query": {
                "id": "cb-2",
                "message": {
                    "message_id": 3,
                    "chat": { "id": 42 }
                }
            }
        }))
        .unwrap();
        assert!(event_from_update(update).is_none());
    }
}
