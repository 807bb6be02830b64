//! Telegram adapter (teloxide).
//!
//! Implements the core `MessagingPort` over the Bot API and maps inbound
//! updates into core messages.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode as TgParseMode};

use tokio::time::sleep;

use fambot_core::{
    domain::{ChatId, MessageId},
    errors::Error,
    outbound::{OutboundPhoto, ParseMode, SendOptions},
    ports::MessagingPort,
    Result,
};

pub mod router;
mod voice;

pub use voice::TelegramTranscriber;

pub struct TelegramMessenger {
    bot: Bot,
    username: String,
}

impl TelegramMessenger {
    /// Connects and resolves the bot's own username (used for invite deep
    /// links).
    pub async fn connect(bot: Bot) -> Result<Self> {
        let me = bot.get_me().await.map_err(map_err)?;
        Ok(Self {
            username: me.username().to_string(),
            bot,
        })
    }

    fn tg_chat(chat: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat.0)
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        // The delivery engine owns the real retry policy; this only honors
        // Telegram's flood-control hint once.
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(map_err(other)),
                },
            }
        }
    }
}

fn map_err(e: teloxide::RequestError) -> Error {
    Error::Telegram(e.to_string())
}

fn map_mode(mode: ParseMode) -> TgParseMode {
    match mode {
        ParseMode::Markdown => TgParseMode::Markdown,
        ParseMode::MarkdownV2 => TgParseMode::MarkdownV2,
        ParseMode::Html => TgParseMode::Html,
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn bot_username(&self) -> &str {
        &self.username
    }

    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageId> {
        let msg = self
            .with_retry(|| {
                let mut req = self.bot.send_message(Self::tg_chat(chat), text.to_string());
                if let Some(mode) = opts.parse_mode {
                    req = req.parse_mode(map_mode(mode));
                }
                if let Some(reply_to) = opts.reply_to {
                    req = req.reply_to_message_id(teloxide::types::MessageId(reply_to.0));
                }
                if opts.disable_link_preview {
                    req = req.disable_web_page_preview(true);
                }
                req
            })
            .await?;

        Ok(MessageId(msg.id.0))
    }

    async fn send_photo(&self, chat: ChatId, photo: &OutboundPhoto) -> Result<MessageId> {
        let url: url::Url = photo
            .url
            .parse()
            .map_err(|e| Error::Telegram(format!("bad photo url: {e}")))?;

        let msg = self
            .with_retry(|| {
                let mut req = self
                    .bot
                    .send_photo(Self::tg_chat(chat), teloxide::types::InputFile::url(url.clone()));
                if let Some(caption) = &photo.caption {
                    req = req.caption(caption.clone());
                }
                req
            })
            .await?;

        Ok(MessageId(msg.id.0))
    }
}
