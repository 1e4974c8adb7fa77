mod command;
mod config;
mod format;
mod handler;
mod movies;
mod server;
mod tg;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = config::Config::from_env().context("invalid configuration")?;
    info!(?cfg, "configuration loaded");

    // один HTTP-клиент на оба исходящих вызова, с общим таймаутом
    let http = reqwest::Client::builder()
        .timeout(cfg.http_timeout)
        .user_agent(concat!("movie-webhook-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let movies = movies::MovieClient::new(cfg.movies_api_url.clone(), http.clone(), cfg.lookup_cache_ttl);
    let replies = tg::ReplyClient::new(&cfg, http);
    let state = handler::AppState::new(movies, replies);

    tg::register(&cfg).await.context("failed to register webhook with Telegram")?;

    server::serve(&cfg, state).await.context("webhook server failed")?;
    Ok(())
}
