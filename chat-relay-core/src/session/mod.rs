//! Chat sessions and their client-side persistence
//!
//! [`ChatManager`] owns the ordered session map and mirrors it to a
//! [`Storage`] backend as one JSON blob. A [`ChatView`] draws whatever the
//! manager decides; a [`CompletionClient`] supplies replies.

pub mod manager;
pub mod reveal;
pub mod storage;
pub mod store;
pub mod theme;
pub mod view;

pub use manager::{ChatManager, ChatSettings, CompletionClient};
pub use reveal::Reveal;
pub use storage::{FileStorage, MemoryStorage, Storage, CHATS_KEY, THEME_KEY};
pub use store::{ChatSession, Message, Sender, SessionMap, NEW_CHAT_TITLE};
pub use theme::Theme;
pub use view::{ChatView, HistoryEntry, RenderedMessage};
