pub mod format;
pub mod telegram;
pub mod traits;

pub use telegram::TelegramChannel;
pub use traits::{CallbackQuery, Channel, IncomingMessage, InlineButton, Update};
