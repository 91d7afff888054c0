//! giga-bot — Telegram front-end for GigaChat language models.
//!
//! Each Telegram user gets an independent conversational session: an active
//! model chosen from the registry, a context toggle, the remembered message
//! history, and the state of the set-system-context sub-dialog. The
//! dispatcher serializes all updates of one user while letting different
//! users proceed concurrently.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod models;
pub mod provider;
pub mod session;
