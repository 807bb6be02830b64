//! Inbound message routing.
//!
//! Every dispatched handler runs on its own task so one slow external call
//! cannot hold up other chats. Handlers perform their own delivery; the
//! dispatcher fires and forgets.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::{
    auth::{self, AuthGate},
    commands,
    config::Config,
    conversation::Conversations,
    delivery::Delivery,
    digest::Composer,
    domain::InboundMessage,
    handlers,
    metrics,
    outbound::OutboundMessage,
    ports::{ChatCompletionApi, NewsApi, Transcriber, WeatherApi},
    store::AuthStore,
};

/// Everything a handler needs, constructed once at startup.
pub struct BotCtx {
    pub cfg: Arc<Config>,
    pub delivery: Delivery,
    pub gate: AuthGate,
    pub store: Arc<dyn AuthStore>,
    pub conversations: Conversations,
    pub completion: Arc<dyn ChatCompletionApi>,
    pub weather: Arc<dyn WeatherApi>,
    pub news: Arc<dyn NewsApi>,
    pub transcriber: Arc<dyn Transcriber>,
    pub composer: Composer,
}

pub struct Dispatcher {
    ctx: Arc<BotCtx>,
    tasks: TaskTracker,
}

impl Dispatcher {
    pub fn new(ctx: Arc<BotCtx>) -> Self {
        Self {
            ctx,
            tasks: TaskTracker::new(),
        }
    }

    /// Stop tracking new handlers and wait for the in-flight ones.
    pub async fn shutdown(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    pub async fn on_message(&self, msg: InboundMessage) {
        if !auth::is_bootstrap(&msg) && !self.ctx.gate.is_authorized(&msg).await {
            info!(chat = msg.chat.0, "skipping message from unauthorized chat");
            if msg.is_private() {
                let notice = format!(
                    "You are not allowed to talk to this bot. \
                     Please contact an administrator. Chat ID: {}",
                    msg.chat.0
                );
                self.ctx
                    .delivery
                    .send(OutboundMessage::plain(msg.chat, notice).reply_to(msg.message_id))
                    .await;
            }
            return;
        }

        metrics::inc_received();
        let ctx = Arc::clone(&self.ctx);

        if let Some(cmd) = commands::find(msg.command_token()) {
            debug!(command = cmd.name, chat = msg.chat.0, "command matched");
            metrics::inc_command_call(cmd.name);
            let kind = cmd.kind;
            self.tasks.spawn(async move {
                handlers::run(ctx, kind, msg).await;
            });
            return;
        }

        if msg.voice.is_some() {
            self.tasks.spawn(async move {
                handlers::voice(ctx, msg).await;
            });
            return;
        }

        if msg.is_private() {
            metrics::inc_command_call("/gpt");
            self.tasks.spawn(async move {
                handlers::gpt(ctx, msg).await;
            });
            return;
        }

        debug!(chat = msg.chat.0, "no handler matched, dropping message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, ChatKind};
    use crate::testutil::{test_ctx, wait_for_sends, TestCtx};

    fn dispatcher(t: &TestCtx) -> Dispatcher {
        Dispatcher::new(Arc::clone(&t.ctx))
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_private_chat_gets_a_denial_notice() {
        let t = test_ctx();
        dispatcher(&t)
            .on_message(t.private_msg(999, "hello"))
            .await;

        let sends = wait_for_sends(&t.port, 1).await;
        assert!(sends[0].text.contains("Chat ID: 999"));
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_group_chat_is_dropped_silently() {
        let t = test_ctx();
        dispatcher(&t)
            .on_message(t.group_msg(-999, "/ping"))
            .await;

        tokio::task::yield_now().await;
        assert!(t.port.sends().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn command_with_botname_suffix_dispatches() {
        let t = test_ctx();
        dispatcher(&t)
            .on_message(t.home_msg("/ping@testbot"))
            .await;

        let sends = wait_for_sends(&t.port, 1).await;
        assert_eq!(sends[0].text, "pong");
    }

    #[tokio::test(start_paused = true)]
    async fn free_text_in_private_chat_goes_to_the_assistant() {
        let t = test_ctx();
        dispatcher(&t)
            .on_message(t.admin_private_msg("what is rust?"))
            .await;

        let sends = wait_for_sends(&t.port, 1).await;
        assert_eq!(sends[0].text, "stub answer");
    }

    #[tokio::test(start_paused = true)]
    async fn free_text_in_group_chat_is_dropped() {
        let t = test_ctx();
        dispatcher(&t).on_message(t.home_msg("just chatting")).await;

        tokio::task::yield_now().await;
        assert!(t.port.sends().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn whoami_bypasses_authorization() {
        let t = test_ctx();
        dispatcher(&t)
            .on_message(t.private_msg(12345, "/whoami"))
            .await;

        let sends = wait_for_sends(&t.port, 1).await;
        assert!(sends[0].text.contains("ChatID: 12345"));
    }

    #[tokio::test(start_paused = true)]
    async fn voice_messages_go_to_the_transcriber() {
        let t = test_ctx();
        let mut msg = t.home_msg("");
        msg.voice = Some(crate::domain::VoiceRef {
            file_id: "file-1".to_string(),
        });
        msg.chat = ChatId(t.ctx.cfg.home_group_id);
        msg.kind = ChatKind::Group;
        dispatcher(&t).on_message(msg).await;

        let sends = wait_for_sends(&t.port, 1).await;
        assert_eq!(sends[0].text, "stub transcript");
    }
}
