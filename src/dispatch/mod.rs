//! Update routing.
//!
//! Session mutation is read-modify-write, so two updates of the same user
//! must never be handled concurrently. The dispatcher gives every user a
//! dedicated worker task with its own queue: updates of one user are
//! processed strictly in arrival order (a new update waits behind an
//! in-flight generation), while different users proceed in parallel.

pub mod command;
pub mod handlers;

pub use command::Command;
pub use handlers::Handlers;

use crate::channels::Update;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Queue depth per user worker.
const WORKER_QUEUE: usize = 32;

pub struct Dispatcher {
    handlers: Arc<Handlers>,
    workers: HashMap<i64, mpsc::Sender<Update>>,
}

impl Dispatcher {
    pub fn new(handlers: Handlers) -> Self {
        Self {
            handlers: Arc::new(handlers),
            workers: HashMap::new(),
        }
    }

    /// Consume the inbound bus until it closes.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Update>) {
        while let Some(update) = rx.recv().await {
            self.route(update).await;
        }
        tracing::info!("update bus closed, dispatcher stopping");
    }

    async fn route(&mut self, update: Update) {
        let user_id = update.user_id();
        let mut pending = update;

        if let Some(tx) = self.workers.get(&user_id) {
            match tx.send(pending).await {
                Ok(()) => return,
                // Worker task is gone (panic); fall through and respawn
                Err(mpsc::error::SendError(update)) => pending = update,
            }
        }

        let tx = Self::spawn_worker(self.handlers.clone(), user_id);
        if tx.send(pending).await.is_err() {
            tracing::error!(user_id, "fresh user worker rejected update");
        }
        self.workers.insert(user_id, tx);
    }

    fn spawn_worker(handlers: Arc<Handlers>, user_id: i64) -> mpsc::Sender<Update> {
        let (tx, mut rx) = mpsc::channel::<Update>(WORKER_QUEUE);

        tokio::spawn(async move {
            tracing::debug!(user_id, "user worker started");
            while let Some(update) = rx.recv().await {
                handlers.handle(update).await;
            }
            tracing::debug!(user_id, "user worker stopped");
        });

        tx
    }
}
