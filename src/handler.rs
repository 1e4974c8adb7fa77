use crate::command::{self, Command, ParseError};
use crate::format::{format_movies, split_for_chat, TELEGRAM_MAX_CHARS};
use crate::movies::{LookupError, MovieClient};
use crate::tg::{ReplyClient, SendError};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const SOMETHING_WENT_WRONG: &str = "Something went wrong, please try again later.";

/* ======= DTOs входящего вебхука ======= */

#[derive(Deserialize, Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    pub message: Message,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Message {
    // у стикеров и фото текста нет, это просто пустая команда
    #[serde(default)]
    pub text: String,
    pub chat: Chat,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
}

/* ======= Результат обработки ======= */

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("could not decode update: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Send(#[from] SendError),
}

/// Этапы обработки одного апдейта, строго по порядку.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Received,
    Decoded,
    Parsed,
    LookedUp,
    Formatted,
    Sent,
}

#[derive(Debug)]
pub enum Outcome {
    Done,
    /// `at`: последний этап, который успел завершиться.
    Aborted { at: Stage, error: HandlerError },
}

#[derive(Clone)]
pub struct AppState {
    pub movies: MovieClient,
    pub replies: ReplyClient,
}

impl AppState {
    pub fn new(movies: MovieClient, replies: ReplyClient) -> Self {
        Self { movies, replies }
    }
}

/// Сырые байты запроса: декодируем и обрабатываем.
pub async fn handle_body(state: &AppState, body: &[u8]) -> Outcome {
    match serde_json::from_slice::<Update>(body) {
        Ok(update) => handle_update(state, update).await,
        Err(e) => {
            warn!(error = %e, "could not decode incoming update");
            Outcome::Aborted { at: Stage::Received, error: e.into() }
        }
    }
}

#[instrument(skip_all, fields(update_id = update.update_id, chat_id = update.message.chat.id))]
pub async fn handle_update(state: &AppState, update: Update) -> Outcome {
    let chat_id = update.message.chat.id;
    let mut stage = Stage::Decoded;

    let cmd = match command::parse(&update.message.text) {
        Ok(cmd) => cmd,
        Err(e) => {
            info!(error = %e, "not a valid command, replying with help");
            let text = format!("{}\n\n{}", parse_hint(e), command::help_text());
            best_effort_reply(state, chat_id, &text).await;
            return Outcome::Aborted { at: stage, error: e.into() };
        }
    };
    advance(&mut stage, Stage::Parsed);

    let text = match cmd {
        Command::Start => command::help_text(),
        Command::SearchMovie { title } => {
            let records = match state.movies.search(&title).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, title = %title, "movie lookup failed");
                    best_effort_reply(state, chat_id, SOMETHING_WENT_WRONG).await;
                    return Outcome::Aborted { at: stage, error: e.into() };
                }
            };
            advance(&mut stage, Stage::LookedUp);
            info!(title = %title, found = records.len(), "movies looked up");
            format_movies(&records)
        }
    };
    advance(&mut stage, Stage::Formatted);

    match reply(state, chat_id, &text).await {
        Ok(body) => {
            advance(&mut stage, Stage::Sent);
            info!(telegram_response = %body, "response delivered");
            Outcome::Done
        }
        Err(e) => {
            warn!(error = %e, "could not deliver response");
            Outcome::Aborted { at: stage, error: e.into() }
        }
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = ?*stage, to = ?next, "stage");
    *stage = next;
}

/// Отправка с разбивкой по лимиту Telegram. Возвращает тело последнего ответа.
async fn reply(state: &AppState, chat_id: i64, text: &str) -> Result<String, SendError> {
    let mut last = String::new();
    for part in split_for_chat(text, TELEGRAM_MAX_CHARS) {
        last = state.replies.send(chat_id, &part).await?;
    }
    Ok(last)
}

async fn best_effort_reply(state: &AppState, chat_id: i64, text: &str) {
    if let Err(e) = reply(state, chat_id, text).await {
        warn!(error = %e, "could not deliver fallback reply");
    }
}

fn parse_hint(e: ParseError) -> &'static str {
    match e {
        ParseError::EmptyInput | ParseError::MissingPrefix => "Type /start to get help.",
        ParseError::MalformedCommand => "Please type the command correctly, e.g. /movies blade.",
        ParseError::UnknownCommand => "Unknown command.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use reqwest::Client;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEND_PATH: &str = "/bot123:abc/sendMessage";

    fn state(server: &MockServer) -> AppState {
        let uri = server.uri();
        let cfg = Config::from_vars(|k| match k {
            "TELEGRAM_BOT_TOKEN" => Some("123:abc".into()),
            "TELEGRAM_API_URL" => Some(uri.clone()),
            "MOVIES_API_URL" => Some(format!("{uri}/query")),
            _ => None,
        })
        .unwrap();
        AppState::new(
            MovieClient::new(cfg.movies_api_url.clone(), Client::new(), None),
            ReplyClient::new(&cfg, Client::new()),
        )
    }

    fn update(text: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": 1,
            "message": {"text": text, "chat": {"id": 42}}
        }))
        .unwrap()
    }

    async fn telegram_ok(server: &MockServer, must_contain: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .and(body_string_contains("chat_id=42"))
            .and(body_string_contains(must_contain))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(times)
            .mount(server)
            .await;
    }

    async fn no_lookup(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn start_sends_greeting_without_lookup() {
        let server = MockServer::start().await;
        no_lookup(&server).await;
        telegram_ok(&server, "%2Fmovies", 1).await;

        let outcome = handle_update(&state(&server), update("/start")).await;
        assert!(matches!(outcome, Outcome::Done), "{outcome:?}");
    }

    #[tokio::test]
    async fn search_replies_with_formatted_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("s", "tron legacy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"title": "TRON: Legacy", "year": "2010", "imdbID": "tt1104001", "poster": "https://tron.jpg"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        telegram_ok(&server, "imdbID%3A+tt1104001", 1).await;

        let outcome = handle_update(&state(&server), update("/movies  tron   legacy")).await;
        assert!(matches!(outcome, Outcome::Done), "{outcome:?}");
    }

    #[tokio::test]
    async fn empty_search_says_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        telegram_ok(&server, "text=No+movies+found.", 1).await;

        let outcome = handle_update(&state(&server), update("/movies qwertyuiop")).await;
        assert!(matches!(outcome, Outcome::Done), "{outcome:?}");
    }

    #[tokio::test]
    async fn bad_command_gets_help_reply() {
        let server = MockServer::start().await;
        no_lookup(&server).await;
        telegram_ok(&server, "Type+%2Fstart+to+get+help.", 1).await;

        let outcome = handle_update(&state(&server), update("hello there")).await;
        match outcome {
            Outcome::Aborted { at, error: HandlerError::Parse(ParseError::MissingPrefix) } => {
                assert_eq!(at, Stage::Decoded)
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_text_gets_help_reply() {
        let server = MockServer::start().await;
        no_lookup(&server).await;
        telegram_ok(&server, "%2Fmovies", 1).await;

        let body = json!({"update_id": 7, "message": {"chat": {"id": 42}}}).to_string();
        let outcome = handle_body(&state(&server), body.as_bytes()).await;
        assert!(matches!(
            outcome,
            Outcome::Aborted { error: HandlerError::Parse(ParseError::EmptyInput), .. }
        ));
    }

    #[tokio::test]
    async fn lookup_failure_sends_generic_reply() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        telegram_ok(&server, "Something+went+wrong", 1).await;

        let outcome = handle_update(&state(&server), update("/movies blade")).await;
        match outcome {
            Outcome::Aborted { at, error: HandlerError::Lookup(LookupError::Status(502)) } => {
                assert_eq!(at, Stage::Parsed)
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_failure_aborts_after_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string(r#"{"ok":false}"#))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = handle_update(&state(&server), update("/start")).await;
        match outcome {
            Outcome::Aborted { at, error: HandlerError::Send(SendError::Rejected { status, .. }) } => {
                assert_eq!(at, Stage::Formatted);
                assert_eq!(status, 403);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_body_is_dropped_silently() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;
        no_lookup(&server).await;

        let outcome = handle_body(&state(&server), b"{not json").await;
        assert!(matches!(outcome, Outcome::Aborted { at: Stage::Received, error: HandlerError::Decode(_) }));

        // сообщения нет вовсе (например, edited_message), тоже молча
        let outcome = handle_body(&state(&server), br#"{"update_id": 3}"#).await;
        assert!(matches!(outcome, Outcome::Aborted { at: Stage::Received, .. }));
    }

    #[tokio::test]
    async fn long_result_is_sent_in_chunks() {
        let server = MockServer::start().await;
        let many: Vec<_> = (0..100)
            .map(|i| json!({"title": format!("Movie {i}"), "year": "1999", "imdbID": format!("tt{i:07}"), "poster": "https://poster.example/very/long/path/to/poster.jpg"}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(many))
            .mount(&server)
            .await;
        telegram_ok(&server, "Title%3A+Movie", 3).await;

        let outcome = handle_update(&state(&server), update("/movies movie")).await;
        assert!(matches!(outcome, Outcome::Done), "{outcome:?}");
    }
}
