use crate::config::Config;
use crate::handler::{self, AppState, Outcome};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, info};

pub fn create_router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(webhook_path, post(webhook))
        .with_state(state)
}

pub async fn serve(cfg: &Config, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr).await?;
    info!(addr = %cfg.listen_addr, path = %cfg.webhook_path, "listening for updates");
    axum::serve(listener, create_router(state, &cfg.webhook_path))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Всегда 200: иначе Telegram будет слать тот же апдейт повторно.
async fn webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    match handler::handle_body(&state, &body).await {
        Outcome::Done => debug!("update handled"),
        Outcome::Aborted { at, error } => debug!(?at, %error, "update aborted"),
    }
    StatusCode::OK
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("ctrl-c received, shutting down");
}
