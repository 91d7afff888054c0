//! giga-bot entry point.

use anyhow::Result;
use clap::{Parser, Subcommand};
use giga_bot::channels::{Channel, TelegramChannel, Update};
use giga_bot::config::Config;
use giga_bot::dispatch::{Command, Dispatcher, Handlers};
use giga_bot::logging::init_logging;
use giga_bot::models::ModelRegistry;
use giga_bot::provider::GigaChatProvider;
use giga_bot::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Capacity of the inbound update bus.
const UPDATE_BUS_CAPACITY: usize = 100;

const LISTENER_INITIAL_BACKOFF_SECS: u64 = 2;
const LISTENER_MAX_BACKOFF_SECS: u64 = 60;

#[derive(Parser)]
#[command(name = "giga-bot", version, about = "Telegram front-end for GigaChat models")]
struct Cli {
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Start the bot (default)
    Run,
    /// Check connectivity of the Telegram and GigaChat backends
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_logging(&config.log_level);
    tracing::info!("giga-bot v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Cmd::Run) {
        Cmd::Run => run(config).await,
        Cmd::Doctor => doctor(config).await,
    }
}

async fn run(config: Config) -> Result<()> {
    let channel = Arc::new(TelegramChannel::new(config.telegram_token.clone()));
    let provider = Arc::new(GigaChatProvider::new(&config));
    let registry = ModelRegistry;
    let store = SessionStore::new(registry);

    // Warm up the OAuth token so the first turn doesn't pay for the
    // credential exchange on top of generation.
    if let Err(e) = provider.warmup().await {
        tracing::warn!("provider warmup failed (non-fatal): {e}");
    }

    if let Err(e) = channel.set_my_commands(Command::menu()).await {
        tracing::warn!("failed to register command menu (non-fatal): {e}");
    }

    let (tx, rx) = mpsc::channel::<Update>(UPDATE_BUS_CAPACITY);
    let _listener = spawn_supervised_listener(channel.clone(), tx);

    let handlers = Handlers::new(channel, provider, registry, store);
    let dispatcher = Dispatcher::new(handlers);

    tracing::info!("listening for updates (Ctrl+C to stop)");

    tokio::select! {
        () = dispatcher.run(rx) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
    }

    Ok(())
}

/// Keep the long-poll listener alive across transport failures with
/// exponential backoff.
fn spawn_supervised_listener(
    channel: Arc<TelegramChannel>,
    tx: mpsc::Sender<Update>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = LISTENER_INITIAL_BACKOFF_SECS;

        loop {
            let result = channel.listen(tx.clone()).await;

            if tx.is_closed() {
                break;
            }

            match result {
                Ok(()) => tracing::warn!("listener exited unexpectedly; restarting"),
                Err(e) => tracing::error!("listener error: {e}; restarting"),
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(LISTENER_MAX_BACKOFF_SECS);
        }
    })
}

async fn doctor(config: Config) -> Result<()> {
    let channel = TelegramChannel::new(config.telegram_token.clone());
    let provider = GigaChatProvider::new(&config);

    println!("giga-bot doctor");
    println!();

    match tokio::time::timeout(Duration::from_secs(10), channel.health_check()).await {
        Ok(true) => println!("  ok    telegram   reachable"),
        Ok(false) => println!("  fail  telegram   unhealthy (token/network)"),
        Err(_) => println!("  fail  telegram   timed out (>10s)"),
    }

    match tokio::time::timeout(Duration::from_secs(10), provider.warmup()).await {
        Ok(Ok(())) => println!("  ok    gigachat   token issued"),
        Ok(Err(e)) => println!("  fail  gigachat   {e}"),
        Err(_) => println!("  fail  gigachat   timed out (>10s)"),
    }

    Ok(())
}
