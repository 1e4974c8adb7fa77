use crate::movies::MovieRecord;
use unicode_segmentation::UnicodeSegmentation;

pub const NO_MOVIES_FOUND: &str = "No movies found.";

/// Лимит Telegram на длину одного сообщения.
pub const TELEGRAM_MAX_CHARS: usize = 4096;

/// Одна строка на запись, порядок как во входе.
pub fn format_movies(records: &[MovieRecord]) -> String {
    if records.is_empty() {
        return NO_MOVIES_FOUND.to_string();
    }
    records.iter().map(movie_line).collect()
}

fn movie_line(m: &MovieRecord) -> String {
    format!(
        "Title: {}, Year: {}, imdbID: {}, Poster: {}\n",
        m.title, m.year, m.imdb_id, m.poster_url
    )
}

/// Режем текст на куски не длиннее `max`, стараясь резать по переводам строк.
/// Длину Telegram считает в UTF-16 code unit-ах, так же считаем и мы; графему не рвём.
/// Строку длиннее `max` режем посередине, иначе её не отправить.
pub fn split_for_chat(text: &str, max: usize) -> Vec<String> {
    if text.is_empty() || max == 0 {
        return Vec::new();
    }
    if utf16_len(text) <= max {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0;
    for line in text.split_inclusive('\n') {
        let len = utf16_len(line);
        if cur_len + len <= max {
            cur.push_str(line);
            cur_len += len;
            continue;
        }
        if !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
            cur_len = 0;
        }
        if len <= max {
            cur.push_str(line);
            cur_len = len;
            continue;
        }
        for g in line.graphemes(true) {
            let g_len = utf16_len(g);
            if cur_len + g_len > max && !cur.is_empty() {
                out.push(std::mem::take(&mut cur));
                cur_len = 0;
            }
            cur.push_str(g);
            cur_len += g_len;
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}
