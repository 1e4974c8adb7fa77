use once_cell::sync::Lazy;
use regex::Regex;
use std::{fmt, net::SocketAddr, time::Duration};
use thiserror::Error;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_MOVIES_API_URL: &str = "https://movies-lib-stg.herokuapp.com/query";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_WEBHOOK_PATH: &str = "/webhook";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+:[A-Za-z0-9_-]+$").expect("valid token regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is missing")]
    Missing(&'static str),
    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Настройки процесса. Собираются один раз при старте и раздаются клиентам.
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub telegram_api_url: String,
    pub movies_api_url: String,
    pub listen_addr: SocketAddr,
    pub webhook_path: String,
    pub webhook_url: Option<String>,
    pub http_timeout: Duration,
    pub lookup_cache_ttl: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Источник переменных подменяемый, тесты не трогают настоящее окружение.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        if !TOKEN_RE.is_match(&bot_token) {
            return Err(ConfigError::Invalid {
                var: "TELEGRAM_BOT_TOKEN",
                reason: "expected <digits>:<token>".into(),
            });
        }

        let telegram_api_url = http_url("TELEGRAM_API_URL", get("TELEGRAM_API_URL"), DEFAULT_TELEGRAM_API_URL)?;
        let movies_api_url = http_url("MOVIES_API_URL", get("MOVIES_API_URL"), DEFAULT_MOVIES_API_URL)?;

        let listen_addr = get("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid { var: "LISTEN_ADDR", reason: e.to_string() })?;

        let webhook_path = get("WEBHOOK_PATH").unwrap_or_else(|| DEFAULT_WEBHOOK_PATH.to_string());
        if !webhook_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                var: "WEBHOOK_PATH",
                reason: "must start with '/'".into(),
            });
        }

        let webhook_url = match get("WEBHOOK_URL") {
            Some(u) => Some(http_url("WEBHOOK_URL", Some(u), "")?),
            None => None,
        };

        let timeout_secs = secs("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), DEFAULT_HTTP_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "HTTP_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            });
        }
        let cache_secs = secs("LOOKUP_CACHE_TTL_SECS", get("LOOKUP_CACHE_TTL_SECS"), 0)?;

        Ok(Self {
            bot_token,
            telegram_api_url,
            movies_api_url,
            listen_addr,
            webhook_path,
            webhook_url,
            http_timeout: Duration::from_secs(timeout_secs),
            lookup_cache_ttl: (cache_secs > 0).then(|| Duration::from_secs(cache_secs)),
        })
    }

    /// `{base}/bot{token}/sendMessage`
    pub fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.telegram_api_url, self.bot_token)
    }
}

// токен в логи не пускаем
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("telegram_api_url", &self.telegram_api_url)
            .field("movies_api_url", &self.movies_api_url)
            .field("listen_addr", &self.listen_addr)
            .field("webhook_path", &self.webhook_path)
            .field("webhook_url", &self.webhook_url)
            .field("http_timeout", &self.http_timeout)
            .field("lookup_cache_ttl", &self.lookup_cache_ttl)
            .finish()
    }
}

fn http_url(var: &'static str, value: Option<String>, default: &str) -> Result<String, ConfigError> {
    let url = value.unwrap_or_else(|| default.to_string());
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Invalid { var, reason: format!("not an http(s) url: {url}") });
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn secs(var: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match value {
        Some(v) => v.parse::<u64>().map_err(|e| ConfigError::Invalid { var, reason: e.to_string() }),
        None => Ok(default),
    }
}
