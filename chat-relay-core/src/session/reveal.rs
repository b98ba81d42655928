//! Progressive reveal of a completed reply.

/// Cursor over a finished text that yields it one character at a time.
///
/// A reveal can be paused between chunks and resumed later, or flushed at
/// once with [`Reveal::finish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reveal {
    text: String,
    /// Byte offset of the next unrevealed character
    cursor: usize,
}

impl Reveal {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cursor: 0,
        }
    }

    /// Next single-character chunk, or `None` when done
    pub fn next_chunk(&mut self) -> Option<&str> {
        let rest = &self.text[self.cursor..];
        let len = rest.chars().next()?.len_utf8();
        let start = self.cursor;
        self.cursor += len;
        Some(&self.text[start..self.cursor])
    }

    /// Everything not yet revealed, consuming it
    pub fn finish(&mut self) -> &str {
        let start = self.cursor;
        self.cursor = self.text.len();
        &self.text[start..]
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.text.len()
    }

    /// The complete text
    pub fn text(&self) -> &str {
        &self.text
    }
}
