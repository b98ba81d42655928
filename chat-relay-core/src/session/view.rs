//! Presentation seam between the session store and a concrete display.

use super::store::Sender;
use super::theme::Theme;

/// A message ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub sender: Sender,
    /// Output of [`crate::format::format_message`]
    pub html: String,
    /// Local `HH:MM`
    pub time: String,
}

/// One row of the history list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub active: bool,
}

/// Display driven by [`super::ChatManager`].
///
/// The manager calls these after every state change; implementations only
/// draw and never touch session state.
pub trait ChatView {
    /// Remove every visible message
    fn clear_messages(&mut self);

    /// Show a new message bubble. An AI bubble under reveal starts empty.
    fn append_message(&mut self, message: &RenderedMessage);

    /// Append revealed text to the bubble being revealed
    fn update_revealed(&mut self, chunk: &str);

    /// The bubble being revealed is complete; `html` is its final markup
    fn finish_reveal(&mut self, html: &str);

    /// Show or hide the typing indicator
    fn set_typing(&mut self, typing: bool);

    /// Title of the open conversation
    fn set_title(&mut self, title: &str);

    /// Redraw the history list
    fn render_history(&mut self, entries: &[HistoryEntry]);

    fn scroll_to_bottom(&mut self) {}

    /// Blocking notification
    fn alert(&mut self, message: &str);

    /// Blocking yes/no question
    fn confirm(&mut self, question: &str) -> bool;

    fn apply_theme(&mut self, _theme: Theme) {}
}
