//! Update handlers: slash commands, the set-system-context sub-dialog, the
//! model-selection callback, and the default conversation path.
//!
//! Handlers never touch the session map directly; everything goes through
//! the store's get/update contract. The dispatcher guarantees that all
//! updates of one user arrive here strictly in order.

use crate::channels::format::escape_markdown_v2;
use crate::channels::{CallbackQuery, Channel, IncomingMessage, InlineButton, Update};
use crate::dispatch::command::Command;
use crate::models::ModelRegistry;
use crate::provider::{ChatMessage, ChatRequest, Provider};
use crate::session::{DialogState, Session, SessionStore};
use std::sync::Arc;

const RESTART_NOTICE: &str = "Бот был перезапущен. Применены стандартные настройки";

/// Welcome text, pre-escaped for MarkdownV2.
const WELCOME: &str = "Привет\\! Это бот для удобной работы с большими языковыми моделями для сотрудников SberAI Lab \nИспользуй команду /help чтобы узнать больше о возможностях бота \nДефолтная модель для запросов: *GigaChat Lite*";

const HELP_TEXT: &str = "\
Для того, чтобы сделать запрос к выбранной модели просто наберите сообщение в чат

Список доступных команд для использования
/start - запуск бота и приветственное сообщение
/presets - выбор модели для инференса
/help - помощь по боту (эта команда)
/enable_context - включить сохранение контекста для модели
/disable_context - выключить сохранение контекста для модели
/set_context - установить изначальный промпт для модели
/show_current_context - показать текущий контекст
/clear_context - очистить текущий контекст
/info - описание всех доступных на данный момент моделей
/model_info - подробное описание выбранной в данный момент модели";

const SET_CONTEXT_PROMPT: &str = "Введите сообщение, которое хотите использовать как системный контекст. Используйте /cancel для отмены действия";
const CANCELLED: &str = "Действие отменено";
const NOTHING_TO_CANCEL: &str = "Нет активного действия для отмены";
const CONTEXT_CLEARED: &str = "Контекст очищен";
const CONTEXT_OFF_NOTICE: &str = "В данный момент сохранение контекста отключено";
const CONTEXT_ALREADY_ON: &str = "Сохранение контекста уже включено";
const CONTEXT_ALREADY_OFF: &str = "Сохранение контекста уже отключено";
const CONTEXT_ON: &str = "Сохранение контекста включено";
const CONTEXT_OFF: &str = "Сохранение контекста отключено";
const CONTEXT_EMPTY: &str = "Текущий контекст пуст";
const CHOOSE_MODEL: &str = "Выберите модель:";
const GENERATION_FAILED: &str =
    "Не удалось получить ответ от модели. Попробуйте повторить запрос позже";

fn is_command_text(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// Shared handler state: the transport, the gateway, the catalog, and the
/// session store.
pub struct Handlers {
    channel: Arc<dyn Channel>,
    provider: Arc<dyn Provider>,
    registry: ModelRegistry,
    store: SessionStore,
}

impl Handlers {
    pub fn new(
        channel: Arc<dyn Channel>,
        provider: Arc<dyn Provider>,
        registry: ModelRegistry,
        store: SessionStore,
    ) -> Self {
        Self {
            channel,
            provider,
            registry,
            store,
        }
    }

    /// Handle one inbound update. Failures are logged, never fatal.
    pub async fn handle(&self, update: Update) {
        let result = match update {
            Update::Message(msg) => self.handle_message(msg).await,
            Update::Callback(query) => self.handle_callback(query).await,
        };

        if let Err(e) = result {
            tracing::error!("update handling failed: {e:#}");
        }
    }

    async fn handle_message(&self, msg: IncomingMessage) -> anyhow::Result<()> {
        let command = Command::parse(&msg.text);

        let (session, created) = self.store.get_or_create(msg.user_id).await;
        if created && command != Some(Command::Start) {
            self.channel.send(msg.chat_id, RESTART_NOTICE).await?;
        }

        if session.dialog == DialogState::AwaitingContext {
            return match command {
                Some(Command::Cancel) => self.cancel_dialog(&msg).await,
                Some(cmd) => {
                    // A command in the middle of the dialog aborts it, then
                    // runs as usual.
                    self.store
                        .update(msg.user_id, |s| s.dialog = DialogState::Idle)
                        .await;
                    self.run_command(&msg, &session, cmd).await
                }
                None if is_command_text(&msg.text) => {
                    tracing::debug!(user_id = msg.user_id, "unknown command during dialog ignored");
                    Ok(())
                }
                None => self.finish_set_context(&msg).await,
            };
        }

        match command {
            Some(cmd) => self.run_command(&msg, &session, cmd).await,
            None if is_command_text(&msg.text) => {
                tracing::debug!(user_id = msg.user_id, text = %msg.text, "unknown command ignored");
                Ok(())
            }
            None => self.converse(&msg, session).await,
        }
    }

    async fn run_command(
        &self,
        msg: &IncomingMessage,
        session: &Session,
        command: Command,
    ) -> anyhow::Result<()> {
        match command {
            Command::Start => self.start(msg).await,
            Command::Help => self.channel.send(msg.chat_id, HELP_TEXT).await,
            Command::Info => self.info(msg).await,
            Command::Presets => self.presets(msg).await,
            Command::ModelInfo => self.model_info(msg, session).await,
            Command::ClearContext => self.clear_context(msg, session).await,
            Command::ShowCurrentContext => self.show_current_context(msg, session).await,
            Command::EnableContext => self.enable_context(msg, session).await,
            Command::DisableContext => self.disable_context(msg, session).await,
            Command::SetContext => self.set_context(msg).await,
            Command::Cancel => self.channel.send(msg.chat_id, NOTHING_TO_CANCEL).await,
        }
    }

    async fn start(&self, msg: &IncomingMessage) -> anyhow::Result<()> {
        self.store.reset(msg.user_id).await;
        self.channel.send_markdown_v2(msg.chat_id, WELCOME).await
    }

    async fn info(&self, msg: &IncomingMessage) -> anyhow::Result<()> {
        let mut text =
            String::from("В данный момент доступны следующие модели для использования:");
        for entry in self.registry.list() {
            text.push_str(&format!(
                "\n{} - размер контекста {}",
                entry.display_name, entry.context_window
            ));
        }
        self.channel.send(msg.chat_id, &text).await
    }

    async fn presets(&self, msg: &IncomingMessage) -> anyhow::Result<()> {
        let buttons: Vec<Vec<InlineButton>> = self
            .registry
            .list()
            .iter()
            .map(|entry| vec![InlineButton::new(entry.display_name, entry.id)])
            .collect();

        self.channel
            .send_inline_keyboard(msg.chat_id, CHOOSE_MODEL, buttons)
            .await?;
        Ok(())
    }

    async fn model_info(&self, msg: &IncomingMessage, session: &Session) -> anyhow::Result<()> {
        let entry = match self.registry.get(&session.model_id) {
            Ok(entry) => entry,
            Err(e) => {
                // The store never holds an id outside the catalog; if it
                // does, surface it in logs instead of replying garbage.
                tracing::error!(user_id = msg.user_id, "session model out of catalog: {e}");
                return Ok(());
            }
        };

        let text = format!(
            "Параметры текущей модели:\nМодель: {}\nИдентификатор: {}\nРазмер контекста: {}\nУровень: {}",
            entry.display_name,
            entry.id,
            entry.context_window,
            entry.tier.as_str()
        );
        self.channel.send(msg.chat_id, &text).await
    }

    async fn clear_context(&self, msg: &IncomingMessage, session: &Session) -> anyhow::Result<()> {
        if !session.context_enabled {
            self.channel.send(msg.chat_id, CONTEXT_OFF_NOTICE).await?;
        }

        self.store.update(msg.user_id, |s| s.history.clear()).await;
        self.channel.send(msg.chat_id, CONTEXT_CLEARED).await
    }

    async fn show_current_context(
        &self,
        msg: &IncomingMessage,
        session: &Session,
    ) -> anyhow::Result<()> {
        if !session.context_enabled {
            return self.channel.send(msg.chat_id, CONTEXT_OFF_NOTICE).await;
        }

        if session.history.is_empty() {
            return self.channel.send(msg.chat_id, CONTEXT_EMPTY).await;
        }

        let lines: Vec<String> = session
            .history
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect();
        self.channel.send(msg.chat_id, &lines.join("\n")).await
    }

    async fn enable_context(&self, msg: &IncomingMessage, session: &Session) -> anyhow::Result<()> {
        if session.context_enabled {
            // Already on: a true no-op, history stays as it is.
            return self.channel.send(msg.chat_id, CONTEXT_ALREADY_ON).await;
        }

        self.store
            .update(msg.user_id, |s| {
                s.context_enabled = true;
                s.history.clear();
            })
            .await;
        self.channel.send(msg.chat_id, CONTEXT_ON).await
    }

    async fn disable_context(
        &self,
        msg: &IncomingMessage,
        session: &Session,
    ) -> anyhow::Result<()> {
        if !session.context_enabled {
            self.channel.send(msg.chat_id, CONTEXT_ALREADY_OFF).await?;
        }

        // Clearing is idempotent, so repeating a disable is harmless.
        self.store
            .update(msg.user_id, |s| {
                s.context_enabled = false;
                s.history.clear();
            })
            .await;
        self.channel.send(msg.chat_id, CONTEXT_OFF).await
    }

    async fn set_context(&self, msg: &IncomingMessage) -> anyhow::Result<()> {
        self.store
            .update(msg.user_id, |s| s.dialog = DialogState::AwaitingContext)
            .await;
        self.channel.send(msg.chat_id, SET_CONTEXT_PROMPT).await
    }

    /// Terminal success of the set-context dialog: the message text replaces
    /// the entire history as the single system instruction.
    async fn finish_set_context(&self, msg: &IncomingMessage) -> anyhow::Result<()> {
        let text = msg.text.clone();
        let session = self
            .store
            .update(msg.user_id, |s| {
                s.history = vec![ChatMessage::system(text.clone())];
                s.dialog = DialogState::Idle;
            })
            .await;

        let reply = if session.context_enabled {
            format!("Контекст очищен. Установлено сообщение: {text}")
        } else {
            format!("Сохранение контекста отключено. Установлено сообщение: {text}")
        };
        self.channel.send(msg.chat_id, &reply).await
    }

    /// Terminal abort of the set-context dialog: history untouched.
    async fn cancel_dialog(&self, msg: &IncomingMessage) -> anyhow::Result<()> {
        self.store
            .update(msg.user_id, |s| s.dialog = DialogState::Idle)
            .await;
        self.channel.send(msg.chat_id, CANCELLED).await
    }

    /// Default path for plain text: one conversational turn.
    async fn converse(&self, msg: &IncomingMessage, session: Session) -> anyhow::Result<()> {
        self.channel
            .send(
                msg.chat_id,
                &format!("Отправляю запрос в {}", session.model_name),
            )
            .await?;

        let mut messages = if session.context_enabled {
            session.history.clone()
        } else {
            Vec::new()
        };
        messages.push(ChatMessage::user(msg.text.clone()));

        let request = ChatRequest {
            model: session.model_id.clone(),
            messages,
        };

        match self.provider.chat(request).await {
            Ok(response) => {
                self.channel
                    .send_markdown_v2(msg.chat_id, &escape_markdown_v2(&response.content))
                    .await?;

                // Remembered history grows by assistant replies only; the
                // user's own turn is not recorded.
                self.store
                    .update(msg.user_id, |s| {
                        if s.context_enabled {
                            s.history.push(ChatMessage::assistant(response.content.clone()));
                        }
                    })
                    .await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(user_id = msg.user_id, "generation failed: {e}");
                self.channel.send(msg.chat_id, GENERATION_FAILED).await
            }
        }
    }

    /// Model selection from the presets keyboard.
    async fn handle_callback(&self, query: CallbackQuery) -> anyhow::Result<()> {
        // Always answer, even for bad data — clients hang a spinner on the
        // button until the callback is acknowledged.
        if let Err(e) = self.channel.answer_callback_query(&query.id, None).await {
            tracing::warn!("failed to answer callback query {}: {e}", query.id);
        }

        let (_, created) = self.store.get_or_create(query.user_id).await;
        if created {
            self.channel.send(query.chat_id, RESTART_NOTICE).await?;
        }

        match self.registry.get(&query.data) {
            Ok(entry) => {
                self.store
                    .update(query.user_id, |s| {
                        s.model_id = entry.id.to_string();
                        s.model_name = entry.display_name.to_string();
                    })
                    .await;

                self.channel
                    .edit_message_text(
                        query.chat_id,
                        query.message_id,
                        &format!("Выбрана модель: {}", entry.display_name),
                    )
                    .await?;

                tracing::info!(user_id = query.user_id, model = entry.id, "model selected");
                Ok(())
            }
            Err(e) => {
                // Prior model stays active; the message is left as is.
                tracing::warn!(user_id = query.user_id, "model selection ignored: {e}");
                Ok(())
            }
        }
    }
}
