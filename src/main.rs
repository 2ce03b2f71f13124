//! PyQuest · Python Tutor Backend
//!
//! - Axum HTTP + WebSocket API over a fixed Python curriculum
//! - Local answer validation (normalized match + ordered pitfall rules)
//! - XP / level / rank / skill progression persisted as a JSON snapshot
//! - Optional OpenAI-compatible judge and hint source (via environment variables)
//! - Static front end fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables the remote judge/hints if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_FAST_MODEL   : hints, default "gpt-4o-mini"
//!   OPENAI_STRONG_MODEL : verdicts, default "gpt-4o"
//!   AGENT_CONFIG_PATH   : path to TOML config (prompts, progression, curriculum bank)
//!   PROGRESS_PATH       : learner snapshot file, default "./data/progress.json"
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod seeds;
mod validator;
mod progress;
mod store;
mod session;
mod state;
mod protocol;
mod logic;
mod openai;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::new());
  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "pyquest_backend", %addr, challenges = state.curriculum.len(), progress = %state.store.path().display(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "pyquest_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "pyquest_backend", error = %e, "Failed to listen for shutdown signal");
  }
}
