use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("movie lookup request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("movie lookup answered with status {0}")]
    Status(u16),
    #[error("movie lookup returned unexpected body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct MovieClient {
    base_url: String,
    http: Client,
    cache: Option<Cache<String, Vec<MovieRecord>>>,
}

impl MovieClient {
    /// `cache_ttl = None`: без кэша, каждый поиск идёт в API.
    pub fn new(base_url: impl Into<String>, http: Client, cache_ttl: Option<Duration>) -> Self {
        let cache = cache_ttl.map(|ttl| Cache::builder().max_capacity(1_000).time_to_live(ttl).build());
        Self { base_url: base_url.into(), http, cache }
    }

    /// Поиск по названию. Пустой список это не ошибка.
    pub async fn search(&self, title: &str) -> Result<Vec<MovieRecord>, LookupError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(title).await {
                debug!(title, count = hit.len(), "movie lookup served from cache");
                return Ok(hit);
            }
        }

        let url = format!("{}?s={}", self.base_url, urlencoding::encode(title));
        let resp = self.http.get(url).send().await.map_err(LookupError::Network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        let body = resp.bytes().await.map_err(LookupError::Network)?;
        // `null` вместо массива встречается, считаем его пустым результатом
        let movies = serde_json::from_slice::<Option<Vec<MovieRecord>>>(&body)?.unwrap_or_default();
        debug!(title, count = movies.len(), "movie lookup finished");

        if let Some(cache) = &self.cache {
            cache.insert(title.to_string(), movies.clone()).await;
        }
        Ok(movies)
    }
}

/* ======= DTOs ======= */

/// Запись как её отдаёт API, без проверок.
///
/// Ключи сравниваются без учёта регистра (`imdbID`, `ImdbId`, `IMDBID` одно и то же),
/// отсутствующее поле или `null` даёт пустую строку, лишние ключи игнорируются.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(try_from = "Map<String, Value>")]
pub struct MovieRecord {
    pub title: String,
    pub year: String,
    pub imdb_id: String,
    pub poster_url: String,
}

impl TryFrom<Map<String, Value>> for MovieRecord {
    type Error = String;

    fn try_from(raw: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut m = MovieRecord::default();
        for (key, value) in raw {
            let slot = match key.to_ascii_lowercase().as_str() {
                "title" => &mut m.title,
                "year" => &mut m.year,
                "imdbid" => &mut m.imdb_id,
                "poster" => &mut m.poster_url,
                _ => continue,
            };
            match value {
                Value::String(v) => *slot = v,
                Value::Null => {}
                other => return Err(format!("field {key:?}: expected a string, got {other}")),
            }
        }
        Ok(m)
    }
}
