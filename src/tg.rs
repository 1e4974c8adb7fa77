use crate::command;
use crate::config::Config;
use reqwest::{Client, Url};
use teloxide::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("sendMessage request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("telegram rejected sendMessage with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/* ====== Отправка ответа в чат ======
   POST form chat_id + text на {base}/bot{token}/sendMessage */
#[derive(Clone)]
pub struct ReplyClient {
    endpoint: String,
    http: Client,
}

impl ReplyClient {
    pub fn new(cfg: &Config, http: Client) -> Self {
        Self { endpoint: cfg.send_message_url(), http }
    }

    /// Возвращает сырое тело ответа Telegram, нужно только для логов.
    pub async fn send(&self, chat_id: i64, text: &str) -> Result<String, SendError> {
        debug!(chat_id, len = text.len(), "sending message");
        let chat_id = chat_id.to_string();
        let resp = self
            .http
            .post(&self.endpoint)
            .form(&[("chat_id", chat_id.as_str()), ("text", text)])
            .send()
            .await
            .map_err(network)?;
        let status = resp.status();
        let body = resp.text().await.map_err(network)?;
        if !status.is_success() {
            return Err(SendError::Rejected { status: status.as_u16(), body });
        }
        Ok(body)
    }
}

// в URL запроса сидит токен, в ошибку его не тащим
fn network(e: reqwest::Error) -> SendError {
    SendError::Network(e.without_url())
}

/* ====== Регистрация вебхука и списка команд ====== */
pub async fn register(cfg: &Config) -> anyhow::Result<()> {
    let Some(webhook_url) = cfg.webhook_url.as_deref() else {
        info!("WEBHOOK_URL not set, skipping webhook registration");
        return Ok(());
    };
    let api_url = Url::parse(&cfg.telegram_api_url)?;
    let bot = Bot::new(cfg.bot_token.clone()).set_api_url(api_url);

    bot.set_webhook(Url::parse(webhook_url)?).await?;
    bot.set_my_commands(command::bot_commands()).await?;
    info!(webhook_url, "webhook and commands registered");
    Ok(())
}
