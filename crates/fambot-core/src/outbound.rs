//! Outbound message model and transport-safe chunking.

use crate::domain::{ChatId, MessageId};

/// Telegram's single-message limit.
pub const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
    MarkdownV2,
    Html,
}

/// Per-call send options handed to the transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct SendOptions {
    pub parse_mode: Option<ParseMode>,
    pub reply_to: Option<MessageId>,
    pub disable_link_preview: bool,
}

/// A composed reply, consumed exclusively by the delivery engine.
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    pub chat: ChatId,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub reply_to: Option<MessageId>,
    pub disable_link_preview: bool,
}

impl OutboundMessage {
    pub fn plain(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat,
            text: text.into(),
            parse_mode: None,
            reply_to: None,
            disable_link_preview: false,
        }
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn no_link_preview(mut self) -> Self {
        self.disable_link_preview = true;
        self
    }
}

/// An image reply: a single binary payload, never chunked.
#[derive(Clone, Debug)]
pub struct OutboundPhoto {
    pub chat: ChatId,
    pub url: String,
    pub caption: Option<String>,
}

/// Split `text` into chunks of at most `max_len` bytes.
///
/// A chunk boundary never falls inside a multi-byte code point: the split
/// backs up to the previous character boundary, so re-joining the chunks
/// reconstructs the input exactly.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 || text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut end = max_len;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // A single code point wider than max_len; emit it whole rather
            // than corrupt it.
            end = remaining
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(remaining.len());
        }

        chunks.push(remaining[..end].to_string());
        remaining = &remaining[end..];
    }
    chunks
}
