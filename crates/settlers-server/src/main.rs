//! Settlers game server.
//!
//! With `SERVER_ADDR` set, serves any number of games over WebSocket.
//! Otherwise drives a single game from JSON lines on stdin.

use settlers_core::GameOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod host;
mod protocol;
mod server;
mod stdio;

use host::GameHost;
use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Ok(addr) = std::env::var("SERVER_ADDR") {
        let addr: SocketAddr = addr.parse()?;
        info!("Starting settlers server...");
        return server::run_server(addr, Arc::new(ServerState::new())).await;
    }

    let options: GameOptions = std::env::var("SETTLERS_OPTIONS")
        .unwrap_or_default()
        .parse()?;
    let seed: u64 = match std::env::var("SETTLERS_SEED") {
        Ok(seed) => seed.parse()?,
        Err(_) => uuid::Uuid::new_v4().as_u64_pair().0,
    };
    info!(%options, seed, "driving one game from stdin");

    let host = GameHost::spawn(settlers_core::Game::new("stdin", options, seed));
    stdio::run(host).await
}
