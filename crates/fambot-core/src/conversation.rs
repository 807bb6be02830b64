//! Short-term conversation memory for the completion handler.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{cache::ExpiringLru, domain::ChatId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Ordered oldest-first.
pub type ConversationHistory = Vec<ConversationTurn>;

/// Per-chat conversation histories behind the capacity + TTL cache.
pub struct Conversations {
    cache: ExpiringLru<ConversationHistory>,
}

impl Conversations {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: ExpiringLru::new(capacity, ttl),
        }
    }

    /// The stored history for a chat; a miss is an empty history.
    pub fn history(&self, chat: ChatId) -> ConversationHistory {
        self.cache.get(&key(chat)).unwrap_or_default()
    }

    /// Append one exchange and store the history back.
    ///
    /// The assistant turn is appended before the user turn, matching the
    /// transcript layout the completion prompt was tuned against.
    pub fn record_exchange(&self, chat: ChatId, question: &str, answer: &str) {
        let mut history = self.history(chat);
        let now = Utc::now();
        history.push(ConversationTurn {
            role: Role::Assistant,
            content: answer.to_string(),
            at: now,
        });
        history.push(ConversationTurn {
            role: Role::User,
            content: question.to_string(),
            at: now,
        });
        self.cache.put(key(chat), history);
    }

    /// Discard a chat's history whole.
    pub fn reset(&self, chat: ChatId) {
        self.cache.remove(&key(chat));
    }
}

/// Drop turns older than `window`. Read-side only: the stored history is
/// never pruned this way.
pub fn prune_window(history: ConversationHistory, window: Duration) -> ConversationHistory {
    let cutoff = Utc::now() - chrono::Duration::from_std(window).unwrap_or(chrono::Duration::zero());
    history.into_iter().filter(|t| t.at > cutoff).collect()
}

fn key(chat: ChatId) -> String {
    chat.0.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn miss_is_an_empty_history() {
        let conv = Conversations::new(10, Duration::from_secs(60));
        assert!(conv.history(ChatId(1)).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exchange_appends_assistant_then_user() {
        let conv = Conversations::new(10, Duration::from_secs(60));
        conv.record_exchange(ChatId(1), "q1", "a1");

        let h = conv.history(ChatId(1));
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].role, Role::Assistant);
        assert_eq!(h[0].content, "a1");
        assert_eq!(h[1].role, Role::User);
        assert_eq!(h[1].content, "q1");
    }

    #[tokio::test(start_paused = true)]
    async fn histories_are_per_chat() {
        let conv = Conversations::new(10, Duration::from_secs(60));
        conv.record_exchange(ChatId(1), "q", "a");
        assert!(conv.history(ChatId(2)).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_then_get_is_empty() {
        let conv = Conversations::new(10, Duration::from_secs(60));
        conv.record_exchange(ChatId(1), "q", "a");
        conv.reset(ChatId(1));
        assert!(conv.history(ChatId(1)).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn prune_window_filters_old_turns_only_on_read() {
        let old = ConversationTurn {
            role: Role::User,
            content: "old".to_string(),
            at: Utc::now() - chrono::Duration::hours(48),
        };
        let fresh = ConversationTurn {
            role: Role::User,
            content: "fresh".to_string(),
            at: Utc::now(),
        };

        let pruned = prune_window(vec![old, fresh], Duration::from_secs(24 * 3600));
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].content, "fresh");
    }
}
