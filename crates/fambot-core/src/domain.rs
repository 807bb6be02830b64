/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// Private chats get the free-text completion fallback; groups do not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

/// Reference to a voice attachment, resolvable through the transport.
#[derive(Clone, Debug)]
pub struct VoiceRef {
    pub file_id: String,
}

/// A shared location attachment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// One inbound chat message, immutable once received.
///
/// Owned exclusively by the dispatcher for the duration of handling.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat: ChatId,
    pub kind: ChatKind,
    pub sender: UserId,
    pub message_id: MessageId,
    pub text: String,
    pub voice: Option<VoiceRef>,
    pub location: Option<Location>,
}

impl InboundMessage {
    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }

    /// Leading token of the text, e.g. `/weather@mybot` for
    /// `/weather@mybot tomorrow`.
    pub fn command_token(&self) -> &str {
        self.text
            .trim_start()
            .split_whitespace()
            .next()
            .unwrap_or("")
    }

    /// Everything after the leading token, trimmed.
    pub fn command_args(&self) -> &str {
        let trimmed = self.text.trim_start();
        match trimmed.split_once(char::is_whitespace) {
            Some((_, rest)) => rest.trim(),
            None => "",
        }
    }
}
