//! HTTP surface: an axum router over [`AppState`].
//!
//! Every route is mounted at its gateway path and at the `/api/*` alias the
//! browser client calls.

mod chat;
mod cookies;
mod diagnostics;
mod dto;
mod error;
mod keys;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;

use crate::state::AppState;

pub use cookies::{UserCredentials, parse_cookie_header, percent_decode};
pub use dto::{ChatRequest, ContentPart, FileEntry, MessageContent, MessagePayload};
pub use error::{ApiError, error_frame};

/// Build the router with all gateway routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(diagnostics::handle_health))
        .route("/chat", post(chat::handle_chat))
        .route("/api/chat", post(chat::handle_chat))
        .route("/check-provider-key", get(keys::handle_check_key))
        .route("/api/check-env-key", get(keys::handle_check_key))
        .route("/export-provider-keys", get(keys::handle_export_keys))
        .route("/api/export-api-keys", get(keys::handle_export_keys))
        .route("/debug-env", get(diagnostics::handle_debug_env))
        .route("/api/debug-env", get(diagnostics::handle_debug_env))
        .with_state(state)
}

/// Serve on the configured address until `shutdown` resolves.
pub async fn serve(
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = state
        .config()
        .server
        .socket_addr()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("gateway stopped");
    Ok(())
}
