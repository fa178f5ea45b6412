//! Chat transcript, input line and the outbound sent-message mailbox.

use crate::mailbox::Mailbox;

/// Longest author name kept, in bytes.
pub const MAX_AUTHOR_BYTES: usize = 63;
/// Longest message body or input line kept, in bytes.
pub const MAX_TEXT_BYTES: usize = 255;
/// Transcript length; older messages are dropped first.
pub const MAX_MESSAGES: usize = 200;

/// One transcript line. Fields are truncated on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        let mut author = author.into();
        let mut text = text.into();
        truncate_utf8(&mut author, MAX_AUTHOR_BYTES);
        truncate_utf8(&mut text, MAX_TEXT_BYTES);
        Self { author, text }
    }
}

/// Cuts `s` to at most `max_bytes`, backing off to a char boundary.
pub fn truncate_utf8(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[derive(Debug, Default)]
pub struct ChatState {
    messages: Vec<ChatMessage>,
    /// Text in the HUD input box, shared with the virtual keyboard.
    pub input: String,
    sent: Mailbox<String>,
    input_focused: Mailbox<()>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Replaces the whole transcript. An empty batch clears it.
    pub fn replace_transcript(&mut self, batch: Vec<ChatMessage>) {
        let mut batch: Vec<ChatMessage> = batch
            .into_iter()
            .map(|m| ChatMessage::new(m.author, m.text))
            .collect();
        if batch.len() > MAX_MESSAGES {
            batch.drain(..batch.len() - MAX_MESSAGES);
        }
        self.messages = batch;
    }

    /// Appends to the input line if it still fits.
    pub fn push_input(&mut self, text: &str) -> bool {
        if self.input.len() + text.len() > MAX_TEXT_BYTES {
            return false;
        }
        self.input.push_str(text);
        true
    }

    pub fn pop_input(&mut self) -> Option<char> {
        self.input.pop()
    }

    /// Moves the input line into the sent mailbox and clears it.
    /// Blank input is ignored.
    pub fn submit_input(&mut self) -> bool {
        let text = self.input.trim();
        if text.is_empty() {
            self.input.clear();
            return false;
        }
        let mut text = text.to_owned();
        truncate_utf8(&mut text, MAX_TEXT_BYTES);
        self.sent.post(text);
        self.input.clear();
        true
    }

    pub fn take_sent(&mut self) -> Option<String> {
        self.sent.take()
    }

    pub fn notify_input_focused(&mut self) {
        self.input_focused.post(());
    }

    pub fn take_input_focused(&mut self) -> bool {
        self.input_focused.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_clears_transcript() {
        let mut chat = ChatState::new();
        chat.replace_transcript(vec![ChatMessage::new("a", "one"), ChatMessage::new("b", "two")]);
        assert_eq!(chat.messages().len(), 2);
        chat.replace_transcript(Vec::new());
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn replace_does_not_append() {
        let mut chat = ChatState::new();
        chat.replace_transcript(vec![ChatMessage::new("a", "one")]);
        chat.replace_transcript(vec![ChatMessage::new("b", "two")]);
        assert_eq!(chat.messages(), &[ChatMessage::new("b", "two")]);
    }

    #[test]
    fn oversized_fields_are_truncated_on_char_boundaries() {
        let author = "é".repeat(40); // 80 bytes
        let text = "x".repeat(300);
        let msg = ChatMessage::new(author, text);
        assert!(msg.author.len() <= MAX_AUTHOR_BYTES);
        assert_eq!(msg.author.chars().count(), 31);
        assert_eq!(msg.text.len(), MAX_TEXT_BYTES);
    }

    #[test]
    fn transcript_keeps_newest_messages() {
        let mut chat = ChatState::new();
        let batch = (0..MAX_MESSAGES + 5)
            .map(|i| ChatMessage::new("bot", i.to_string()))
            .collect();
        chat.replace_transcript(batch);
        assert_eq!(chat.messages().len(), MAX_MESSAGES);
        assert_eq!(chat.messages()[0].text, "5");
    }

    #[test]
    fn submit_is_one_shot_and_clears_input() {
        let mut chat = ChatState::new();
        assert!(chat.push_input("hello "));
        assert!(chat.submit_input());
        assert!(chat.input.is_empty());
        assert_eq!(chat.take_sent().as_deref(), Some("hello"));
        assert_eq!(chat.take_sent(), None);

        chat.push_input("   ");
        assert!(!chat.submit_input());
        assert_eq!(chat.take_sent(), None);
    }

    #[test]
    fn input_line_is_capped() {
        let mut chat = ChatState::new();
        assert!(chat.push_input(&"a".repeat(MAX_TEXT_BYTES)));
        assert!(!chat.push_input("b"));
        assert_eq!(chat.pop_input(), Some('a'));
        assert!(chat.push_input("b"));
    }
}
