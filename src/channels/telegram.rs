//! Telegram channel — long-polls the Bot API for updates.

use super::traits::{CallbackQuery, Channel, IncomingMessage, InlineButton, Update};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Long-poll wait in seconds for `getUpdates`.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a transport error before the next poll.
const POLL_RETRY_SECS: u64 = 5;

pub struct TelegramChannel {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    async fn call(&self, method: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram {method} failed: {err}");
        }

        Ok(resp.json().await?)
    }

    /// Register the command menu shown in the Telegram client.
    pub async fn set_my_commands(&self, commands: &[(&str, &str)]) -> anyhow::Result<()> {
        let commands: Vec<serde_json::Value> = commands
            .iter()
            .map(|(command, description)| {
                serde_json::json!({ "command": command, "description": description })
            })
            .collect();

        let count = commands.len();
        self.call("setMyCommands", serde_json::json!({ "commands": commands }))
            .await?;
        tracing::info!(count, "Telegram command menu registered");
        Ok(())
    }

    /// Parse a `message` JSON object into an [`IncomingMessage`].
    fn parse_message(message: &serde_json::Value) -> Option<IncomingMessage> {
        let chat_id = message.get("chat")?.get("id")?.as_i64()?;
        let user_id = message.get("from")?.get("id")?.as_i64()?;
        let text = message.get("text")?.as_str()?.to_string();

        Some(IncomingMessage {
            chat_id,
            user_id,
            text,
        })
    }

    /// Parse a `callback_query` JSON object into a [`CallbackQuery`].
    fn parse_callback_query(callback: &serde_json::Value) -> Option<CallbackQuery> {
        let id = callback.get("id")?.as_str()?.to_string();
        let data = callback.get("data")?.as_str()?.to_string();
        let user_id = callback.get("from")?.get("id")?.as_i64()?;

        let message = callback.get("message")?;
        let chat_id = message.get("chat")?.get("id")?.as_i64()?;
        let message_id = message.get("message_id")?.as_i64()?;

        Some(CallbackQuery {
            id,
            user_id,
            chat_id,
            message_id,
            data,
        })
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.call(
            "sendMessage",
            serde_json::json!({ "chat_id": chat_id, "text": text }),
        )
        .await?;
        Ok(())
    }

    async fn send_markdown_v2(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.call(
            "sendMessage",
            serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "MarkdownV2"
            }),
        )
        .await?;
        Ok(())
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        buttons: Vec<Vec<InlineButton>>,
    ) -> anyhow::Result<i64> {
        let keyboard: Vec<Vec<serde_json::Value>> = buttons
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|btn| {
                        serde_json::json!({
                            "text": btn.text,
                            "callback_data": btn.callback_data
                        })
                    })
                    .collect()
            })
            .collect();

        let data = self
            .call(
                "sendMessage",
                serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                    "reply_markup": { "inline_keyboard": keyboard }
                }),
            )
            .await?;

        data.get("result")
            .and_then(|r| r.get("message_id"))
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("Missing message_id in sendMessage response"))
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut body = serde_json::json!({ "callback_query_id": callback_query_id });
        if let Some(t) = text {
            body["text"] = serde_json::Value::String(t.to_string());
        }

        self.call("answerCallbackQuery", body).await?;
        tracing::debug!("answered callback query {callback_query_id}");
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> anyhow::Result<()> {
        self.call(
            "editMessageText",
            serde_json::json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "text": text
            }),
        )
        .await?;
        Ok(())
    }

    async fn listen(&self, tx: mpsc::Sender<Update>) -> anyhow::Result<()> {
        let mut offset: i64 = 0;

        tracing::info!("Telegram channel listening for updates...");

        loop {
            let body = serde_json::json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": ["message", "callback_query"]
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
                    tokio::time::sleep(std::time::Duration::from_secs(POLL_RETRY_SECS)).await;
                    continue;
                }
            };

            let data: serde_json::Value = match resp.json().await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Telegram parse error: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(POLL_RETRY_SECS)).await;
                    continue;
                }
            };

            let Some(results) = data.get("result").and_then(serde_json::Value::as_array) else {
                continue;
            };

            for raw in results {
                // Advance offset past this update
                if let Some(uid) = raw.get("update_id").and_then(serde_json::Value::as_i64) {
                    offset = uid + 1;
                }

                let update = if let Some(callback) = raw.get("callback_query") {
                    Self::parse_callback_query(callback).map(Update::Callback)
                } else if let Some(message) = raw.get("message") {
                    // Non-text messages (photos, stickers, voice) are skipped
                    Self::parse_message(message).map(Update::Message)
                } else {
                    None
                };

                let Some(update) = update else { continue };

                if tx.send(update).await.is_err() {
                    // Receiver dropped, dispatcher is gone
                    return Ok(());
                }
            }
        }
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telegram_channel_name() {
        let ch = TelegramChannel::new("fake-token".into());
        assert_eq!(ch.name(), "telegram");
    }

    #[test]
    fn telegram_api_url() {
        let ch = TelegramChannel::new("123:ABC".into());
        assert_eq!(
            ch.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
        assert_eq!(
            ch.api_url("answerCallbackQuery"),
            "https://api.telegram.org/bot123:ABC/answerCallbackQuery"
        );
    }

    #[test]
    fn parse_message_valid() {
        let message = serde_json::json!({
            "message_id": 10,
            "from": { "id": 42, "username": "alice" },
            "chat": { "id": 42 },
            "text": "/start"
        });

        let msg = TelegramChannel::parse_message(&message).unwrap();
        assert_eq!(msg.chat_id, 42);
        assert_eq!(msg.user_id, 42);
        assert_eq!(msg.text, "/start");
    }

    #[test]
    fn parse_message_without_text_skipped() {
        let message = serde_json::json!({
            "message_id": 10,
            "from": { "id": 42 },
            "chat": { "id": 42 },
            "photo": [{ "file_id": "abc" }]
        });

        assert!(TelegramChannel::parse_message(&message).is_none());
    }

    #[test]
    fn parse_callback_query_valid() {
        let callback = serde_json::json!({
            "id": "callback-123",
            "from": { "id": 42, "username": "alice" },
            "message": {
                "message_id": 999,
                "chat": { "id": 42 }
            },
            "data": "GigaChat-Pro"
        });

        let query = TelegramChannel::parse_callback_query(&callback).unwrap();
        assert_eq!(query.id, "callback-123");
        assert_eq!(query.user_id, 42);
        assert_eq!(query.chat_id, 42);
        assert_eq!(query.message_id, 999);
        assert_eq!(query.data, "GigaChat-Pro");
    }

    #[test]
    fn parse_callback_query_missing_fields() {
        let callback = serde_json::json!({ "id": "callback-789" });
        assert!(TelegramChannel::parse_callback_query(&callback).is_none());
    }

    #[test]
    fn update_user_id_key() {
        let update = Update::Message(IncomingMessage {
            chat_id: 7,
            user_id: 9,
            text: "hi".into(),
        });
        assert_eq!(update.user_id(), 9);

        let update = Update::Callback(CallbackQuery {
            id: "x".into(),
            user_id: 11,
            chat_id: 7,
            message_id: 1,
            data: "GigaChat".into(),
        });
        assert_eq!(update.user_id(), 11);
    }

    #[tokio::test]
    async fn send_fails_without_server() {
        let ch = TelegramChannel::new("fake-token".into());
        // No real server behind the token; must surface an error, not panic
        let result = ch.send(123, "test").await;
        assert!(result.is_err());
    }
}
