use async_trait::async_trait;
use tokio::sync::mpsc;

/// A single inline keyboard button.
#[derive(Debug, Clone)]
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

/// A plain text or command message received from a user.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub text: String,
}

/// Callback query received when a user clicks an inline button.
#[derive(Debug, Clone)]
pub struct CallbackQuery {
    pub id: String,
    pub user_id: i64,
    pub chat_id: i64,
    pub message_id: i64,
    pub data: String,
}

/// One inbound update from the transport.
#[derive(Debug, Clone)]
pub enum Update {
    Message(IncomingMessage),
    Callback(CallbackQuery),
}

impl Update {
    /// The user this update belongs to (the serialization key).
    pub fn user_id(&self) -> i64 {
        match self {
            Self::Message(msg) => msg.user_id,
            Self::Callback(query) => query.user_id,
        }
    }
}

/// Chat transport seam — implement for any messaging platform.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Send a plain text message.
    async fn send(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;

    /// Send a message rendered with the transport's markup rules.
    /// The caller is responsible for escaping (see [`super::format`]).
    async fn send_markdown_v2(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;

    /// Send a message with inline keyboard buttons.
    /// Returns the `message_id` of the sent message for later editing.
    async fn send_inline_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        buttons: Vec<Vec<InlineButton>>,
    ) -> anyhow::Result<i64>;

    /// Acknowledge a callback query (removes the client-side spinner).
    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Edit the text of an existing message.
    async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str)
        -> anyhow::Result<()>;

    /// Start listening for incoming updates (long-running).
    async fn listen(&self, tx: mpsc::Sender<Update>) -> anyhow::Result<()>;

    /// Check if the channel is healthy.
    async fn health_check(&self) -> bool {
        true
    }
}
