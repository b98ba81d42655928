//! Utility functions and helpers

use std::path::{Path, PathBuf};

/// Titles derived from a first message keep this many characters.
pub const TITLE_MAX_CHARS: usize = 30;

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir<P: AsRef<Path>>(path: P) -> std::io::Result<PathBuf> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// Create a safe filename from a string
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Session title from the first user message: the first 30 characters,
/// with `...` appended only when the message was longer.
pub fn derive_title(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("hello world"), "hello_world");
        assert_eq!(safe_filename("test/file:name"), "test_file_name");
        assert_eq!(safe_filename("aiChats"), "aiChats");
    }

    #[test]
    fn test_derive_title_short_message_unchanged() {
        assert_eq!(derive_title("Hello"), "Hello");
        let exact = "a".repeat(30);
        assert_eq!(derive_title(&exact), exact);
    }

    #[test]
    fn test_derive_title_truncates_long_message() {
        let long = "Explain the borrow checker to me like I am five";
        let title = derive_title(long);
        assert_eq!(title, "Explain the borrow checker to ...");
        assert_eq!(title.chars().count(), 33);
    }

    #[test]
    fn test_derive_title_counts_characters_not_bytes() {
        let message = "é".repeat(31);
        assert_eq!(derive_title(&message), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("data/chats"), PathBuf::from("data/chats"));
    }
}
