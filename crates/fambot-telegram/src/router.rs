//! Long-polling update loop.

use std::sync::Arc;

use teloxide::{
    dispatching::Dispatcher as TgDispatcher,
    dptree,
    prelude::*,
    types::BotCommand,
};
use tracing::info;

use fambot_core::{
    commands,
    dispatcher::{BotCtx, Dispatcher},
    domain::{ChatId, ChatKind, InboundMessage, Location, MessageId, UserId, VoiceRef},
};

/// Register the visible command surface and consume updates until the
/// process terminates.
pub async fn run_polling(bot: Bot, ctx: Arc<BotCtx>) -> anyhow::Result<()> {
    register_commands(&bot).await?;
    info!("starting long polling");

    let dispatcher = Arc::new(Dispatcher::new(ctx));

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

    TgDispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::clone(&dispatcher)])
        .build()
        .dispatch()
        .await;

    // Let in-flight handlers finish their deliveries.
    dispatcher.shutdown().await;
    Ok(())
}

async fn register_commands(bot: &Bot) -> anyhow::Result<()> {
    let cmds: Vec<BotCommand> = commands::visible()
        .map(|c| BotCommand::new(c.name.trim_start_matches('/'), c.description))
        .collect();
    bot.set_my_commands(cmds).await?;
    Ok(())
}

async fn handle_message(
    _bot: Bot,
    msg: Message,
    dispatcher: Arc<Dispatcher>,
) -> ResponseResult<()> {
    if let Some(inbound) = map_message(&msg) {
        dispatcher.on_message(inbound).await;
    }
    Ok(())
}

/// Telegram update -> core message. Channel posts and sender-less service
/// messages are ignored.
fn map_message(msg: &Message) -> Option<InboundMessage> {
    if msg.chat.is_channel() {
        return None;
    }
    let from = msg.from()?;

    let kind = if msg.chat.is_private() {
        ChatKind::Private
    } else {
        ChatKind::Group
    };

    Some(InboundMessage {
        chat: ChatId(msg.chat.id.0),
        kind,
        sender: UserId(from.id.0 as i64),
        message_id: MessageId(msg.id.0),
        text: msg.text().unwrap_or_default().to_string(),
        voice: msg.voice().map(|v| VoiceRef {
            file_id: v.file.id.clone(),
        }),
        location: msg.location().map(|l| Location {
            lat: l.latitude,
            lon: l.longitude,
        }),
    })
}
