//! Slash command surface.

/// All recognized slash commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Info,
    Presets,
    ClearContext,
    ShowCurrentContext,
    EnableContext,
    DisableContext,
    ModelInfo,
    SetContext,
    Cancel,
}

impl Command {
    /// Parse a message text into a command.
    ///
    /// Accepts the `/command` and `/command@botname` forms; trailing
    /// arguments are ignored. Returns `None` for free text and for slash
    /// commands outside the surface.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.trim().split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        // Group chats append the bot name: /help@giga_bot
        let name = name.split('@').next().unwrap_or(name);

        match name {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "info" => Some(Self::Info),
            "presets" => Some(Self::Presets),
            "clear_context" => Some(Self::ClearContext),
            "show_current_context" => Some(Self::ShowCurrentContext),
            "enable_context" => Some(Self::EnableContext),
            "disable_context" => Some(Self::DisableContext),
            "model_info" => Some(Self::ModelInfo),
            "set_context" => Some(Self::SetContext),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }

    /// Commands shown in the Telegram menu button, with descriptions.
    pub const fn menu() -> &'static [(&'static str, &'static str)] {
        &[
            ("start", "Старт"),
            ("presets", "Выбрать модель для взаимодействия"),
            ("clear_context", "Очистить контекст"),
            ("set_context", "Установить контекст"),
            ("enable_context", "Включить сохранение контекста"),
            ("disable_context", "Выключить сохранение контекста"),
            ("help", "Помощь"),
            ("info", "Информация о моделях"),
        ]
    }
}
