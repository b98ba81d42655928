//! Chat session manager: the single writer of the session map.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::reveal::Reveal;
use super::storage::{Storage, CHATS_KEY, THEME_KEY};
use super::store::{ChatSession, Message, Sender, SessionMap, NEW_CHAT_TITLE};
use super::theme::Theme;
use super::view::{ChatView, HistoryEntry, RenderedMessage};
use crate::config::schema::{ClientConfig, RestoreSelection};
use crate::format::{format_message, format_time, strip_tags};
use crate::utils::derive_title;

/// Source of completion text for a user message.
///
/// Implementations never fail: transport and gateway errors come back as
/// user-facing text, which the manager stores like any other reply.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, message: &str) -> String;
}

/// Tunables of a [`ChatManager`]
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub max_message_chars: usize,
    /// Delay between revealed characters
    pub reveal_interval: Duration,
    pub restore: RestoreSelection,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for ChatSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_message_chars: config.max_message_chars,
            reveal_interval: Duration::from_millis(config.reveal_interval_ms),
            restore: config.restore,
        }
    }
}

/// AI reply being revealed into a stored message
#[derive(Debug)]
struct PendingReveal {
    session_id: String,
    message_index: usize,
    reveal: Reveal,
}

/// Owns the session map, the current-session pointer and the in-flight
/// reveal. All mutation goes through `&mut self`, so sends on one manager
/// never interleave.
pub struct ChatManager {
    storage: Arc<dyn Storage>,
    client: Arc<dyn CompletionClient>,
    settings: ChatSettings,
    sessions: SessionMap,
    current: Option<String>,
    theme: Theme,
    pending: Option<PendingReveal>,
}

impl ChatManager {
    /// Create a manager with an empty session map. Call [`ChatManager::restore`]
    /// to load persisted state.
    pub fn new(
        storage: Arc<dyn Storage>,
        client: Arc<dyn CompletionClient>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            storage,
            client,
            settings,
            sessions: SessionMap::new(),
            current: None,
            theme: Theme::default(),
            pending: None,
        }
    }

    /// Send a user message and arm the reveal of the reply.
    ///
    /// The reply is not shown until [`ChatManager::play_reveal`] or
    /// [`ChatManager::finish_reveal`] runs.
    pub async fn send_message(&mut self, view: &mut dyn ChatView, text: &str) -> crate::Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let max = self.settings.max_message_chars;
        if text.chars().count() > max {
            view.alert(&format!(
                "Message is too long. Maximum length is {} characters.",
                max
            ));
            return Err(crate::Error::Validation(format!(
                "message exceeds {} characters",
                max
            )));
        }

        self.finish_reveal(view)?;

        let session_id = match self.current_session_with_messages() {
            Some(id) => id,
            None => self.start_session(view, text),
        };

        let user_message = Message::new(Sender::User, text);
        view.append_message(&render(&user_message));
        view.scroll_to_bottom();
        self.push_message(&session_id, user_message);
        self.persist()?;

        view.set_typing(true);
        view.scroll_to_bottom();
        debug!(session = %session_id, "Requesting completion");
        let reply = self.client.complete(text).await;

        let ai_message = Message::new(Sender::Ai, "");
        view.append_message(&RenderedMessage {
            sender: Sender::Ai,
            html: String::new(),
            time: format_time(&ai_message.timestamp),
        });
        view.scroll_to_bottom();
        let message_index = self.push_message(&session_id, ai_message);
        self.persist()?;

        self.pending = Some(PendingReveal {
            session_id,
            message_index,
            reveal: Reveal::new(reply),
        });
        Ok(())
    }

    /// Reveal the pending reply one character per tick.
    ///
    /// Returns `Ok(true)` once the reply is fully revealed and stored, or
    /// `Ok(false)` if `cancel` fired first; a later call resumes where this
    /// one stopped.
    pub async fn play_reveal(
        &mut self,
        view: &mut dyn ChatView,
        cancel: &CancellationToken,
    ) -> crate::Result<bool> {
        if self.pending.is_none() {
            return Ok(true);
        }

        let period = self.settings.reveal_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(false),
                _ = ticker.tick() => {
                    if !self.tick_reveal(view)? {
                        return Ok(true);
                    }
                }
            }
        }
    }

    /// Reveal one character. Returns whether more remain.
    pub fn tick_reveal(&mut self, view: &mut dyn ChatView) -> crate::Result<bool> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(false);
        };
        if let Some(chunk) = pending.reveal.next_chunk() {
            view.update_revealed(chunk);
            view.scroll_to_bottom();
        }
        if pending.reveal.is_done() {
            self.commit_reveal(view)?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Show the rest of the pending reply at once and store it.
    pub fn finish_reveal(&mut self, view: &mut dyn ChatView) -> crate::Result<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };
        let rest = pending.reveal.finish();
        if !rest.is_empty() {
            view.update_revealed(rest);
            view.scroll_to_bottom();
        }
        self.commit_reveal(view)
    }

    /// Whether a reply is waiting to be revealed
    pub fn is_revealing(&self) -> bool {
        self.pending.is_some()
    }

    fn commit_reveal(&mut self, view: &mut dyn ChatView) -> crate::Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let text = pending.reveal.text().to_string();
        view.finish_reveal(&format_message(&text));
        view.set_typing(false);

        match self
            .sessions
            .get_mut(&pending.session_id)
            .and_then(|s| s.messages.get_mut(pending.message_index))
        {
            Some(message) => message.text = text,
            None => {
                warn!(session = %pending.session_id, "Revealed reply has no stored message");
                return Ok(());
            }
        }
        self.persist()
    }

    /// Close the open conversation. Stored sessions are untouched.
    pub fn new_chat(&mut self, view: &mut dyn ChatView) -> crate::Result<()> {
        self.finish_reveal(view)?;
        self.current = None;
        view.clear_messages();
        view.set_title(NEW_CHAT_TITLE);
        view.render_history(&self.history());
        Ok(())
    }

    /// Open a stored session and render all of its messages.
    pub fn load_chat(&mut self, view: &mut dyn ChatView, id: &str) -> crate::Result<()> {
        if !self.sessions.contains(id) {
            return Err(crate::Error::NotFound(format!("chat '{}'", id)));
        }
        self.finish_reveal(view)?;

        let Some(session) = self.sessions.get(id) else {
            return Err(crate::Error::NotFound(format!("chat '{}'", id)));
        };
        view.clear_messages();
        view.set_title(&session.title);
        for message in &session.messages {
            view.append_message(&render(message));
        }
        view.scroll_to_bottom();

        self.current = Some(id.to_string());
        view.render_history(&self.history());
        debug!(session = %id, "Loaded chat");
        Ok(())
    }

    /// Rename a session. A blank title is ignored.
    pub fn rename_chat(
        &mut self,
        view: &mut dyn ChatView,
        id: &str,
        title: &str,
    ) -> crate::Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(());
        }
        let Some(session) = self.sessions.get_mut(id) else {
            return Err(crate::Error::NotFound(format!("chat '{}'", id)));
        };
        session.title = title.to_string();
        self.persist()?;

        view.render_history(&self.history());
        if self.current.as_deref() == Some(id) {
            view.set_title(title);
        }
        Ok(())
    }

    /// Drop every session after the view confirms. Returns whether history
    /// was cleared.
    pub fn clear_all_history(&mut self, view: &mut dyn ChatView) -> crate::Result<bool> {
        if !view.confirm("Are you sure you want to clear all chat history?") {
            return Ok(false);
        }

        if self.pending.take().is_some() {
            view.set_typing(false);
        }
        self.storage.remove(CHATS_KEY)?;
        self.sessions.clear();
        self.current = None;

        view.clear_messages();
        view.set_title(NEW_CHAT_TITLE);
        view.render_history(&self.history());
        info!("Cleared chat history");
        Ok(true)
    }

    /// Write the whole session map as one blob.
    pub fn persist(&self) -> crate::Result<()> {
        let blob = self.sessions.to_blob()?;
        self.storage.set(CHATS_KEY, &blob)
    }

    /// Load the theme and session map from storage and open a session.
    ///
    /// An unreadable blob is logged and treated as an empty history.
    pub fn restore(&mut self, view: &mut dyn ChatView) -> crate::Result<()> {
        match self.storage.get(THEME_KEY) {
            Ok(Some(name)) => match name.parse::<Theme>() {
                Ok(theme) => self.theme = theme,
                Err(e) => warn!("Ignoring stored theme: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Ignoring stored theme: {}", e),
        }
        view.apply_theme(self.theme);

        self.pending = None;
        self.current = None;
        self.sessions = match self.storage.get(CHATS_KEY) {
            Ok(Some(blob)) => SessionMap::from_blob(&blob).unwrap_or_else(|e| {
                warn!("Stored chat history is unreadable, starting empty: {}", e);
                SessionMap::new()
            }),
            Ok(None) => SessionMap::new(),
            Err(e) => {
                warn!("Stored chat history is unreadable, starting empty: {}", e);
                SessionMap::new()
            }
        };
        info!(sessions = self.sessions.len(), "Restored chat history");

        view.render_history(&self.history());
        let selected = match self.settings.restore {
            RestoreSelection::First => self.sessions.first_id(),
            RestoreSelection::MostRecent => self.sessions.most_recent_id(),
        }
        .map(str::to_string);

        match selected {
            Some(id) => self.load_chat(view, &id),
            None => {
                view.clear_messages();
                view.set_title(NEW_CHAT_TITLE);
                Ok(())
            }
        }
    }

    /// Switch between light and dark and remember the choice.
    pub fn toggle_theme(&mut self, view: &mut dyn ChatView) -> crate::Result<Theme> {
        self.theme = self.theme.toggled();
        self.storage.set(THEME_KEY, self.theme.as_str())?;
        view.apply_theme(self.theme);
        Ok(self.theme)
    }

    /// Latest AI reply of the open chat as plain text, markup stripped.
    ///
    /// A reply still being revealed is returned in full.
    pub fn last_reply_text(&self) -> Option<String> {
        let session = self.current()?;
        let (index, message) = session
            .messages
            .iter()
            .enumerate()
            .rev()
            .find(|(_, m)| m.sender == Sender::Ai)?;

        let text = match &self.pending {
            Some(p) if p.session_id == session.id && p.message_index == index => p.reveal.text(),
            _ => message.text.as_str(),
        };
        Some(strip_tags(&format_message(text)))
    }

    /// History list rows in stored order
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.sessions
            .iter()
            .map(|s| HistoryEntry {
                id: s.id.clone(),
                title: s.title.clone(),
                active: self.current.as_deref() == Some(s.id.as_str()),
            })
            .collect()
    }

    pub fn current(&self) -> Option<&ChatSession> {
        self.current.as_deref().and_then(|id| self.sessions.get(id))
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn sessions(&self) -> &SessionMap {
        &self.sessions
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    fn current_session_with_messages(&self) -> Option<String> {
        self.current()
            .filter(|s| !s.messages.is_empty())
            .map(|s| s.id.clone())
    }

    fn start_session(&mut self, view: &mut dyn ChatView, first_message: &str) -> String {
        let id = self.sessions.next_id(Utc::now());
        let session = ChatSession::new(id.clone(), derive_title(first_message));
        view.set_title(&session.title);
        self.sessions.insert(session);
        self.current = Some(id.clone());
        view.render_history(&self.history());
        info!(session = %id, "Started new chat");
        id
    }

    /// Append to a session, returning the new message's index.
    fn push_message(&mut self, session_id: &str, message: Message) -> usize {
        match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.messages.push(message);
                session.messages.len() - 1
            }
            None => 0,
        }
    }
}

fn render(message: &Message) -> RenderedMessage {
    RenderedMessage {
        sender: message.sender,
        html: format_message(&message.text),
        time: format_time(&message.timestamp),
    }
}
