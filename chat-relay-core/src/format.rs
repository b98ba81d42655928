//! Display formatting for message text.
//!
//! The pipeline is one-way: stored messages keep their source text and are
//! run through [`format_message`] each time they are shown.

use chrono::{DateTime, Local, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(\w+)?\n(.*?)\n```").expect("valid code block regex"));
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("valid bold regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([^_]+)_").expect("valid italic regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Language tag used when a fenced block has none.
pub const DEFAULT_CODE_LANGUAGE: &str = "plaintext";

/// Escape the five HTML metacharacters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_html`]. `&amp;` goes last so `&amp;lt;` stays `&lt;`.
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// Render message text as display markup.
///
/// Escapes first, then extracts fenced code blocks, then applies `*bold*`
/// and `_italic_` to the text outside those blocks only.
pub fn format_message(text: &str) -> String {
    let escaped = escape_html(text);
    let mut out = String::with_capacity(escaped.len());
    let mut last = 0;

    for caps in CODE_BLOCK.captures_iter(&escaped) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&format_inline(&escaped[last..whole.start()]));
        out.push_str(&render_code_block(&caps));
        last = whole.end();
    }
    out.push_str(&format_inline(&escaped[last..]));
    out
}

fn render_code_block(caps: &Captures<'_>) -> String {
    let language = caps
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or(DEFAULT_CODE_LANGUAGE);
    let code = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    format!(
        "<pre><code class=\"language-{}\">{}</code></pre>",
        language, code
    )
}

fn format_inline(text: &str) -> String {
    let bold = BOLD.replace_all(text, "<strong>$1</strong>");
    ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

/// Local wall-clock `HH:MM` for a message timestamp.
pub fn format_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

/// Plain text of rendered markup, as copied to the clipboard.
pub fn strip_tags(markup: &str) -> String {
    unescape_html(&TAG.replace_all(markup, ""))
}
