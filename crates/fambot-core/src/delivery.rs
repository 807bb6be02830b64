//! Reliable delivery to the transport.
//!
//! Oversized texts are chunked; each chunk gets a bounded number of
//! attempts with a fixed pause in between. Formatting errors are a common,
//! non-transient cause of send failure, so the parse mode is dropped after
//! the first failed attempt and stays dropped. A chunk that exhausts its
//! attempts abandons the rest of the message; the caller is never blocked
//! indefinitely and never sees an error.

use std::{sync::Arc, time::Duration};

use tracing::{debug, error, info};

use crate::{
    domain::ChatId,
    metrics,
    outbound::{chunk_text, OutboundMessage, OutboundPhoto, SendOptions, MAX_MESSAGE_LEN},
    ports::MessagingPort,
};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Retry progression for a single chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
    /// First try, with the requested formatting.
    Initial,
    /// Formatting dropped; `n` is the attempt number (2-based).
    Downgraded { n: u32 },
}

impl Attempt {
    fn next(self) -> Option<Attempt> {
        match self {
            Attempt::Initial => Some(Attempt::Downgraded { n: 2 }),
            Attempt::Downgraded { n } if n < MAX_ATTEMPTS => {
                Some(Attempt::Downgraded { n: n + 1 })
            }
            Attempt::Downgraded { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct Delivery {
    port: Arc<dyn MessagingPort>,
}

impl Delivery {
    pub fn new(port: Arc<dyn MessagingPort>) -> Self {
        Self { port }
    }

    pub fn bot_username(&self) -> &str {
        self.port.bot_username()
    }

    /// Deliver `msg`, chunking as needed. Failures are logged, never
    /// returned.
    pub async fn send(&self, msg: OutboundMessage) {
        if msg.text.is_empty() {
            debug!(chat = msg.chat.0, "zero-length message dropped");
            return;
        }

        for chunk in chunk_text(&msg.text, MAX_MESSAGE_LEN) {
            if !self.send_chunk(msg.chat, &chunk, &msg).await {
                error!(chat = msg.chat.0, "abandoning remaining chunks");
                return;
            }
        }
    }

    async fn send_chunk(&self, chat: ChatId, chunk: &str, msg: &OutboundMessage) -> bool {
        let mut attempt = Attempt::Initial;
        loop {
            let opts = SendOptions {
                parse_mode: match attempt {
                    Attempt::Initial => msg.parse_mode,
                    Attempt::Downgraded { .. } => None,
                },
                reply_to: msg.reply_to,
                disable_link_preview: msg.disable_link_preview,
            };

            match self.port.send_text(chat, chunk, &opts).await {
                Ok(_) => {
                    metrics::inc_sent();
                    return true;
                }
                Err(e) => match attempt.next() {
                    Some(next) => {
                        info!(
                            chat = chat.0,
                            err = %e,
                            "send failed, retrying in 5 seconds without formatting"
                        );
                        tokio::time::sleep(RETRY_DELAY).await;
                        attempt = next;
                    }
                    None => {
                        error!(chat = chat.0, err = %e, "send failed, giving up");
                        return false;
                    }
                },
            }
        }
    }

    /// Deliver a photo: bounded retry, no chunking, no format downgrade.
    pub async fn send_photo(&self, photo: OutboundPhoto) {
        for n in 1..=MAX_ATTEMPTS {
            match self.port.send_photo(photo.chat, &photo).await {
                Ok(_) => {
                    metrics::inc_sent();
                    return;
                }
                Err(e) if n < MAX_ATTEMPTS => {
                    info!(chat = photo.chat.0, err = %e, "photo send failed, retrying in 5 seconds");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    error!(chat = photo.chat.0, err = %e, "photo send failed, giving up");
                }
            }
        }
    }
}
