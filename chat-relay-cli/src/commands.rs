//! Slash commands of the interactive chat.
//!
//! Lines starting with `/` drive the session store instead of being sent.

/// A parsed chat command
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new conversation
    New,

    /// Open a stored conversation by id
    Load(String),

    /// Rename a stored conversation
    Rename { id: String, title: String },

    /// List stored conversations
    History,

    /// Delete every stored conversation (asks first)
    Clear,

    /// Switch between light and dark palettes
    Theme,

    /// Print the latest reply as plain text
    Copy,

    /// Text sent as a message; `//` escapes a leading slash
    Say(String),

    Help,

    Quit,

    /// Report a parsing error back to the caller
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `None` if the input should be sent as a message.
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if let Some(escaped) = input.strip_prefix("//") {
        return Some(ChatCommand::Say(format!("/{}", escaped)));
    }

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "load" | "open" => match argument {
            Some(id) => ChatCommand::Load(id.to_string()),
            None => ChatCommand::Invalid("/load requires a chat id".to_string()),
        },
        "rename" => parse_rename(argument),
        "history" | "list" => ChatCommand::History,
        "clear" => ChatCommand::Clear,
        "theme" => ChatCommand::Theme,
        "copy" => ChatCommand::Copy,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_rename(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid("/rename requires a chat id and a title".to_string());
    };

    let mut parts = arg.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or_default().to_string();
    let title = parts.next().map(str::trim).unwrap_or_default().to_string();
    ChatCommand::Rename { id, title }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new chat
  /load <id>             Open a chat from history
  /rename <id> <title>   Rename a chat
  /history               List stored chats
  /clear                 Delete all chat history
  /theme                 Toggle light/dark theme
  /copy                  Print the last reply as plain text
  /help                  Show this help message
  /quit                  Exit the chat
Start a message with // to send text beginning with /.
Press Ctrl+C while waiting for a reply to show it at once."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_message() {
        assert_eq!(parse_command("Hello there"), None);
        assert_eq!(parse_command("  what does /new do?"), None);
    }

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /Q  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_load() {
        assert_eq!(
            parse_command("/load 1700000000000"),
            Some(ChatCommand::Load("1700000000000".to_string()))
        );
        assert_eq!(
            parse_command("/load"),
            Some(ChatCommand::Invalid("/load requires a chat id".to_string()))
        );
    }

    #[test]
    fn parse_rename() {
        assert_eq!(
            parse_command("/rename 42   Trip   planning "),
            Some(ChatCommand::Rename {
                id: "42".to_string(),
                title: "Trip   planning".to_string(),
            })
        );
        assert_eq!(
            parse_command("/rename 42"),
            Some(ChatCommand::Rename {
                id: "42".to_string(),
                title: String::new(),
            })
        );
        assert!(matches!(
            parse_command("/rename"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("/new"), Some(ChatCommand::New));
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/theme"), Some(ChatCommand::Theme));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/copy"), Some(ChatCommand::Copy));
    }

    #[test]
    fn parse_escaped_slash_is_sent() {
        assert_eq!(
            parse_command("//usr/bin is missing"),
            Some(ChatCommand::Say("/usr/bin is missing".to_string()))
        );
        assert_eq!(
            parse_command("  ///etc  "),
            Some(ChatCommand::Say("//etc".to_string()))
        );
    }

    #[test]
    fn parse_unknown_command() {
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }
}
