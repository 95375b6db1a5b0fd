//! Room Sync Server - authoritative room-partitioned state synchronization
//!
//! Clients connect over WebSocket, claim a `(name, room)` identity and stream
//! their own transform. The server keeps the single authoritative copy of every
//! player record, applies combat between players in the same room and pushes
//! a full room refresh to every member after each change.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;

use std::future::Future;

use tokio::net::TcpListener;

pub use app::AppState;
pub use config::Config;

/// Serve the router on `listener` until `shutdown` resolves
pub async fn run<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, http::build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
