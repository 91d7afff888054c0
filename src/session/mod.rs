//! Per-user conversational sessions.
//!
//! The store owns the only mutable map in the system. Handlers never see the
//! map itself — they read snapshots and apply mutations through [`SessionStore::update`].
//! State is deliberately ephemeral: a process restart starts everyone over
//! with defaults, and the dispatcher tells them so.

use crate::models::ModelRegistry;
use crate::provider::ChatMessage;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// State of the set-system-context sub-dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogState {
    /// No sub-dialog in progress.
    #[default]
    Idle,
    /// `/set_context` was issued; the next free-text message becomes the
    /// system instruction.
    AwaitingContext,
}

/// One user's conversational state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Active model id (always a valid registry id).
    pub model_id: String,
    /// Display name cached from the registry entry.
    pub model_name: String,
    /// When false, turns are sent without history and nothing is recorded.
    pub context_enabled: bool,
    /// Remembered messages, insertion-ordered, unbounded.
    pub history: Vec<ChatMessage>,
    pub dialog: DialogState,
}

impl Session {
    fn with_defaults(registry: ModelRegistry) -> Self {
        let entry = registry.default_entry();
        Self {
            model_id: entry.id.to_string(),
            model_name: entry.display_name.to_string(),
            context_enabled: true,
            history: Vec::new(),
            dialog: DialogState::default(),
        }
    }
}

/// Keyed store of one [`Session`] per Telegram user id.
pub struct SessionStore {
    registry: ModelRegistry,
    sessions: RwLock<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new(registry: ModelRegistry) -> Self {
        Self {
            registry,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Return the user's session, creating one with defaults if absent.
    /// The boolean reports whether defaults were (re)applied, so the caller
    /// can tell the user that prior customization was lost.
    pub async fn get_or_create(&self, user_id: i64) -> (Session, bool) {
        if let Some(session) = self.sessions.read().await.get(&user_id) {
            return (session.clone(), false);
        }

        let session = Session::with_defaults(self.registry);
        let mut sessions = self.sessions.write().await;
        // A concurrent creation wins; re-read under the write lock.
        let entry = sessions
            .entry(user_id)
            .or_insert_with(|| session.clone());
        (entry.clone(), true)
    }

    /// Apply a mutation to the user's session, creating it first if absent.
    /// Returns the state after the mutation.
    pub async fn update<F>(&self, user_id: i64, mutate: F) -> Session
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user_id)
            .or_insert_with(|| Session::with_defaults(self.registry));
        mutate(session);
        session.clone()
    }

    /// Reset the user's session to defaults (the `/start` semantics).
    pub async fn reset(&self, user_id: i64) -> Session {
        let session = Session::with_defaults(self.registry);
        self.sessions
            .write()
            .await
            .insert(user_id, session.clone());
        session
    }
}
