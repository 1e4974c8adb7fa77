use teloxide::types::BotCommand;
use thiserror::Error;

pub const PREFIX: char = '/';
pub const START: &str = "/start";
pub const MOVIES: &str = "/movies";

/* ====== Команды ====== */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    SearchMovie { title: String },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("message is empty")]
    EmptyInput,
    #[error("message does not start with '/'")]
    MissingPrefix,
    #[error("command has no argument")]
    MalformedCommand,
    #[error("unknown command")]
    UnknownCommand,
}

/// Разбор текста сообщения в команду.
///
/// Название фильма собирается из токенов через один пробел, так что
/// `/movies  tron   legacy` даёт `tron legacy`.
pub fn parse(text: &str) -> Result<Command, ParseError> {
    if text.is_empty() {
        return Err(ParseError::EmptyInput);
    }
    if !text.starts_with(PREFIX) {
        return Err(ParseError::MissingPrefix);
    }
    if text.trim_matches(' ') == START {
        return Ok(Command::Start);
    }

    let mut words = text.split_whitespace();
    let cmd = words.next().unwrap_or_default();
    let title = words.collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        return Err(ParseError::MalformedCommand);
    }

    match cmd {
        MOVIES => Ok(Command::SearchMovie { title }),
        _ => Err(ParseError::UnknownCommand),
    }
}

/// Таблица команд: идёт и в setMyCommands, и в текст справки.
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "show this help"),
        BotCommand::new("movies", "search movies by title, e.g. /movies blade runner"),
    ]
}

pub fn help_text() -> String {
    let mut out = String::from("Hi! I look up movies for you.\nCommands:\n");
    for c in bot_commands() {
        out.push_str(&format!("/{} - {}\n", c.command, c.description));
    }
    out
}
