//! Interactive chat loop.

use anyhow::Result;
use chat_relay_core::config::Config;
use chat_relay_core::session::{ChatManager, ChatSettings, ChatView, FileStorage};
use chat_relay_core::utils::expand_tilde;
use console::style;
use dialoguer::Input;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::ApiClient;
use crate::commands::{help_text, parse_command, ChatCommand};
use crate::terminal::TerminalView;

/// Ctrl+C presses seen while the chat runs.
///
/// One listener covers the whole session, so an interrupt never kills the
/// process halfway through a send. The prompt itself reads Ctrl+C as a key.
pub struct Interrupts {
    rx: mpsc::UnboundedReceiver<()>,
    listener: Option<JoinHandle<()>>,
}

impl Interrupts {
    pub fn listen() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        Self {
            rx,
            listener: Some(listener),
        }
    }

    #[cfg(test)]
    fn from_receiver(rx: mpsc::UnboundedReceiver<()>) -> Self {
        Self { rx, listener: None }
    }

    /// Drop presses left over from before the current send
    fn clear(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }

    async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

impl Drop for Interrupts {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

pub async fn run_chat(config: &Config) -> Result<()> {
    let storage = Arc::new(FileStorage::new(expand_tilde(&config.client.data_dir)));
    let client = Arc::new(ApiClient::new(config.client.gateway_url.clone()));
    let mut manager = ChatManager::new(
        storage.clone(),
        client,
        ChatSettings::from(&config.client),
    );
    let mut view = TerminalView::new();
    let mut interrupts = Interrupts::listen();

    manager.restore(&mut view)?;
    println!("{}", style("chat-relay").bold().cyan());
    println!(
        "Gateway: {}  Data: {}",
        config.client.gateway_url,
        storage.dir().display()
    );
    println!("Type /help for commands.\n");

    loop {
        let line: String = match Input::new()
            .with_prompt(view.prompt())
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(dialoguer::Error::IO(e)) if e.kind() == ErrorKind::Interrupted => break,
            Err(e) => return Err(e.into()),
        };

        let command = match parse_command(&line) {
            None => {
                send_and_reveal(&mut manager, &mut view, &line, &mut interrupts).await?;
                continue;
            }
            Some(ChatCommand::Say(text)) => {
                send_and_reveal(&mut manager, &mut view, &text, &mut interrupts).await?;
                continue;
            }
            Some(command) => command,
        };

        match command {
            ChatCommand::New => manager.new_chat(&mut view)?,
            ChatCommand::Load(id) => match manager.load_chat(&mut view, &id) {
                Err(chat_relay_core::Error::NotFound(_)) => {
                    view.error(&format!("No chat with id {}", id));
                }
                other => other?,
            },
            ChatCommand::Rename { id, title } => {
                match manager.rename_chat(&mut view, &id, &title) {
                    Err(chat_relay_core::Error::NotFound(_)) => {
                        view.error(&format!("No chat with id {}", id));
                    }
                    other => other?,
                }
            }
            ChatCommand::History => view.print_history(),
            ChatCommand::Clear => {
                if manager.clear_all_history(&mut view)? {
                    view.notice("Chat history cleared.");
                }
            }
            ChatCommand::Theme => {
                manager.toggle_theme(&mut view)?;
                view.notice(&format!("Theme: {}", view.theme()));
            }
            ChatCommand::Copy => match manager.last_reply_text() {
                Some(text) => view.print_plain(&text),
                None => view.notice("No reply to copy yet."),
            },
            ChatCommand::Help => println!("{}", help_text()),
            ChatCommand::Quit => break,
            ChatCommand::Invalid(message) => view.error(&message),
            ChatCommand::Say(_) => {}
        }
    }

    manager.finish_reveal(&mut view)?;
    println!("{}", style("Goodbye!").green());
    Ok(())
}

/// Send one message and play its reveal.
///
/// Ctrl+C at any point after the send starts, including while the gateway
/// is still answering, shows the whole reply as soon as it is there.
pub async fn send_and_reveal(
    manager: &mut ChatManager,
    view: &mut dyn ChatView,
    text: &str,
    interrupts: &mut Interrupts,
) -> Result<()> {
    interrupts.clear();
    let cancel = CancellationToken::new();

    let relay = async {
        if interrupts.next().await.is_some() {
            debug!("Interrupted; revealing reply at once");
            cancel.cancel();
        }
        std::future::pending::<()>().await
    };

    let work = async {
        match manager.send_message(view, text).await {
            Ok(()) => {}
            // Already shown to the user as an alert.
            Err(chat_relay_core::Error::Validation(_)) => return Ok(()),
            Err(e) => return Err(anyhow::Error::from(e)),
        }
        if !manager.play_reveal(view, &cancel).await? {
            manager.finish_reveal(view)?;
        }
        Ok::<(), anyhow::Error>(())
    };

    tokio::select! {
        result = work => result,
        _ = relay => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chat_relay_core::session::{
        CompletionClient, HistoryEntry, MemoryStorage, RenderedMessage, Sender,
    };
    use std::time::Duration;

    #[derive(Default)]
    struct ChunkView {
        chunks: Vec<String>,
        alerts: Vec<String>,
    }

    impl ChatView for ChunkView {
        fn clear_messages(&mut self) {}
        fn append_message(&mut self, _message: &RenderedMessage) {}
        fn update_revealed(&mut self, chunk: &str) {
            self.chunks.push(chunk.to_string());
        }
        fn finish_reveal(&mut self, _html: &str) {}
        fn set_typing(&mut self, _typing: bool) {}
        fn set_title(&mut self, _title: &str) {}
        fn render_history(&mut self, _entries: &[HistoryEntry]) {}
        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }
        fn confirm(&mut self, _question: &str) -> bool {
            false
        }
    }

    /// Replies after optionally simulating Ctrl+C while the request is open
    struct InterruptingClient {
        reply: String,
        interrupt: Option<mpsc::UnboundedSender<()>>,
    }

    #[async_trait]
    impl CompletionClient for InterruptingClient {
        async fn complete(&self, _message: &str) -> String {
            if let Some(tx) = &self.interrupt {
                let _ = tx.send(());
            }
            tokio::task::yield_now().await;
            self.reply.clone()
        }
    }

    fn manager(client: InterruptingClient, reveal_interval: Duration) -> ChatManager {
        let settings = ChatSettings {
            reveal_interval,
            ..ChatSettings::default()
        };
        ChatManager::new(Arc::new(MemoryStorage::new()), Arc::new(client), settings)
    }

    fn last_ai_text(manager: &ChatManager) -> Option<String> {
        manager
            .current()?
            .messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Ai)
            .map(|m| m.text.clone())
    }

    #[tokio::test]
    async fn test_interrupt_during_request_shows_whole_reply() {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = InterruptingClient {
            reply: "a long reply".to_string(),
            interrupt: Some(tx),
        };
        // An hour per character: only the interrupt can finish this in time.
        let mut manager = manager(client, Duration::from_secs(3600));
        let mut view = ChunkView::default();
        let mut interrupts = Interrupts::from_receiver(rx);

        tokio::time::timeout(
            Duration::from_secs(5),
            send_and_reveal(&mut manager, &mut view, "hi", &mut interrupts),
        )
        .await
        .expect("interrupt should end the reveal")
        .unwrap();

        assert!(!manager.is_revealing());
        assert_eq!(view.chunks, vec!["a long reply"]);
        assert_eq!(last_ai_text(&manager).as_deref(), Some("a long reply"));
    }

    #[tokio::test]
    async fn test_stale_interrupt_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(()).unwrap();
        let client = InterruptingClient {
            reply: "ok".to_string(),
            interrupt: None,
        };
        let mut manager = manager(client, Duration::from_millis(1));
        let mut view = ChunkView::default();
        let mut interrupts = Interrupts::from_receiver(rx);

        send_and_reveal(&mut manager, &mut view, "hi", &mut interrupts)
            .await
            .unwrap();

        assert_eq!(view.chunks, vec!["o", "k"]);
        assert_eq!(last_ai_text(&manager).as_deref(), Some("ok"));
        drop(tx);
    }

    #[tokio::test]
    async fn test_overlong_message_is_not_fatal() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let client = InterruptingClient {
            reply: "unused".to_string(),
            interrupt: None,
        };
        let mut manager = manager(client, Duration::from_millis(1));
        let mut view = ChunkView::default();
        let mut interrupts = Interrupts::from_receiver(rx);

        send_and_reveal(&mut manager, &mut view, &"x".repeat(5001), &mut interrupts)
            .await
            .unwrap();

        assert_eq!(view.alerts.len(), 1);
        assert!(manager.sessions().is_empty());
    }
}
