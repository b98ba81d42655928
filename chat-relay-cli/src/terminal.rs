//! Terminal rendering of the chat.

use chat_relay_core::format::strip_tags;
use chat_relay_core::session::{ChatView, HistoryEntry, RenderedMessage, Sender, Theme};
use console::{Style, Term};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::io::Write;
use std::time::Duration;

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<pre><code class="language-(\w+)">(.*?)</code></pre>"#)
        .expect("valid code block regex")
});
static STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<strong>(.*?)</strong>").expect("valid strong regex"));
static EM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<em>(.*?)</em>").expect("valid em regex"));

/// Colors of one theme
#[derive(Debug, Clone)]
pub struct Palette {
    pub user: Style,
    pub ai: Style,
    pub accent: Style,
    pub muted: Style,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                user: Style::new().blue().bold(),
                ai: Style::new().magenta().bold(),
                accent: Style::new().blue(),
                muted: Style::new().black().bright(),
            },
            Theme::Dark => Self {
                user: Style::new().cyan().bold(),
                ai: Style::new().green().bold(),
                accent: Style::new().cyan(),
                muted: Style::new().dim(),
            },
        }
    }
}

/// Turn display markup into styled terminal text.
pub fn render_markup(html: &str, palette: &Palette) -> String {
    let text = CODE_BLOCK.replace_all(html, |caps: &Captures<'_>| {
        let header = palette.accent.apply_to(format!("[{}]", &caps[1]));
        let body = palette.muted.apply_to(&caps[2]);
        format!("\n{}\n{}\n", header, body)
    });
    let bold = Style::new().bold();
    let text = STRONG.replace_all(&text, |caps: &Captures<'_>| {
        bold.apply_to(&caps[1]).to_string()
    });
    let italic = Style::new().italic();
    let text = EM.replace_all(&text, |caps: &Captures<'_>| {
        italic.apply_to(&caps[1]).to_string()
    });
    strip_tags(&text)
}

/// [`ChatView`] drawing to stdout
pub struct TerminalView {
    term: Term,
    palette: Palette,
    theme: Theme,
    spinner: Option<ProgressBar>,
    history: Vec<HistoryEntry>,
    title: String,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            palette: Palette::for_theme(Theme::default()),
            theme: Theme::default(),
            spinner: None,
            history: Vec::new(),
            title: String::new(),
        }
    }

    /// Prompt label for the input line
    pub fn prompt(&self) -> String {
        self.palette.user.apply_to("You").to_string()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Print the stored chats, marking the open one
    pub fn print_history(&self) {
        println!("{}", self.palette.accent.apply_to(format!("Open: {}", self.title)));
        if self.history.is_empty() {
            println!("{}", self.palette.muted.apply_to("No saved chats."));
            return;
        }
        for entry in &self.history {
            let marker = if entry.active { "*" } else { " " };
            println!(
                "{} {}  {}",
                self.palette.accent.apply_to(marker),
                self.palette.muted.apply_to(&entry.id),
                entry.title
            );
        }
    }

    /// Print a message that is not part of the conversation
    pub fn notice(&self, message: &str) {
        println!("{}", self.palette.muted.apply_to(message));
    }

    /// Print text with no styling so it can be selected and copied
    pub fn print_plain(&self, text: &str) {
        println!("{}", text);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", Style::new().red().apply_to(message));
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn label(&self, sender: Sender, time: &str) -> String {
        let (name, style) = match sender {
            Sender::User => ("You", &self.palette.user),
            Sender::Ai => ("AI", &self.palette.ai),
        };
        format!(
            "{} {}",
            self.palette.muted.apply_to(format!("[{}]", time)),
            style.apply_to(name)
        )
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView for TerminalView {
    fn clear_messages(&mut self) {
        self.stop_spinner();
        let _ = self.term.clear_screen();
    }

    fn append_message(&mut self, message: &RenderedMessage) {
        self.stop_spinner();
        let label = self.label(message.sender, &message.time);
        if message.sender == Sender::Ai && message.html.is_empty() {
            // Reply about to be revealed: chunks follow on the same line.
            print!("{}: ", label);
            let _ = std::io::stdout().flush();
        } else {
            println!("{}: {}", label, render_markup(&message.html, &self.palette));
        }
    }

    fn update_revealed(&mut self, chunk: &str) {
        print!("{}", chunk);
        let _ = std::io::stdout().flush();
    }

    fn finish_reveal(&mut self, _html: &str) {
        println!();
    }

    fn set_typing(&mut self, typing: bool) {
        if !typing {
            self.stop_spinner();
            return;
        }
        if self.spinner.is_some() {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("AI is typing...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        println!(
            "{}",
            self.palette.accent.apply_to(format!("── {} ──", title))
        );
    }

    fn render_history(&mut self, entries: &[HistoryEntry]) {
        self.history = entries.to_vec();
    }

    fn alert(&mut self, message: &str) {
        self.stop_spinner();
        eprintln!("{}", Style::new().yellow().bold().apply_to(message));
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.stop_spinner();
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .unwrap_or(false)
    }

    fn apply_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.palette = Palette::for_theme(theme);
    }
}
