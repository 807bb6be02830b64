//! Command handlers.
//!
//! Handlers own their delivery and never return errors: collaborator
//! failures become fixed apology strings, everything else is logged.

use std::sync::Arc;

use tracing::{debug, error};

use crate::{
    commands::{self, CommandKind},
    conversation::prune_window,
    digest::{format_city, sort_forecasts},
    dispatcher::BotCtx,
    domain::InboundMessage,
    outbound::{OutboundMessage, ParseMode},
    store::mint_invite_token,
};

const COMPLETION_APOLOGY: &str = "Something went wrong talking to the assistant :(";
const NOT_ALLOWED: &str = "You are not allowed to run this command.";

pub async fn run(ctx: Arc<BotCtx>, kind: CommandKind, msg: InboundMessage) {
    match kind {
        CommandKind::Ping => ping(&ctx, &msg).await,
        CommandKind::Weather => weather(&ctx, &msg).await,
        CommandKind::Gpt => gpt(ctx, msg).await,
        CommandKind::NewChat => new_chat(&ctx, &msg).await,
        CommandKind::News => news(&ctx, &msg).await,
        CommandKind::Eng => eng(&ctx, &msg).await,
        CommandKind::WhoAmI => whoami(&ctx, &msg).await,
        CommandKind::Digest => digest(&ctx, &msg).await,
        CommandKind::Revision => revision(&ctx, &msg).await,
        CommandKind::AddChat => add_chat(&ctx, &msg).await,
        CommandKind::RemoveChat => remove_chat(&ctx, &msg).await,
        CommandKind::ListChats => list_chats(&ctx, &msg).await,
        CommandKind::Invite => invite(&ctx, &msg).await,
        CommandKind::Start => start(&ctx, &msg).await,
        CommandKind::Help => help(&ctx, &msg).await,
    }
}

async fn ping(ctx: &BotCtx, msg: &InboundMessage) {
    ctx.delivery
        .send(OutboundMessage::plain(msg.chat, "pong").reply_to(msg.message_id))
        .await;
}

async fn weather(ctx: &BotCtx, msg: &InboundMessage) {
    let mut forecasts = ctx.weather.forecasts().await;
    if forecasts.is_empty() {
        ctx.delivery
            .send(OutboundMessage::plain(msg.chat, "No data available.").reply_to(msg.message_id))
            .await;
        return;
    }

    sort_forecasts(&mut forecasts);
    let text: String = forecasts.iter().map(format_city).collect();
    ctx.delivery
        .send(
            OutboundMessage::plain(msg.chat, text)
                .parse_mode(ParseMode::MarkdownV2)
                .reply_to(msg.message_id),
        )
        .await;
}

/// `/gpt <text>`, and the default for free text in private chats.
pub async fn gpt(ctx: Arc<BotCtx>, msg: InboundMessage) {
    let question = if commands::find(msg.command_token())
        .is_some_and(|c| c.kind == CommandKind::Gpt)
    {
        msg.command_args().to_string()
    } else {
        msg.text.trim().to_string()
    };

    if question.is_empty() {
        debug!(chat = msg.chat.0, "empty question");
        ctx.delivery
            .send(OutboundMessage::plain(msg.chat, "Empty question.").reply_to(msg.message_id))
            .await;
        return;
    }

    let mut history = ctx.conversations.history(msg.chat);
    if let Some(window) = ctx.cfg.context_window {
        history = prune_window(history, window);
    }

    let answer = match ctx.completion.complete(&question, &history).await {
        Ok(a) if !a.is_empty() => a,
        Ok(_) | Err(_) => {
            ctx.delivery
                .send(
                    OutboundMessage::plain(msg.chat, COMPLETION_APOLOGY)
                        .reply_to(msg.message_id),
                )
                .await;
            return;
        }
    };

    ctx.conversations.record_exchange(msg.chat, &question, &answer);

    ctx.delivery
        .send(
            OutboundMessage::plain(msg.chat, answer)
                .parse_mode(ParseMode::Markdown)
                .no_link_preview()
                .reply_to(msg.message_id),
        )
        .await;
}

async fn new_chat(ctx: &BotCtx, msg: &InboundMessage) {
    ctx.conversations.reset(msg.chat);
    ctx.delivery
        .send(OutboundMessage::plain(
            msg.chat,
            "Assistant context cleared.",
        ))
        .await;
}

async fn news(ctx: &BotCtx, msg: &InboundMessage) {
    let mut text = String::new();
    for site in &ctx.cfg.news_site_urls {
        let headlines = match ctx.news.latest(site, ctx.cfg.news_per_source).await {
            Ok(h) => h,
            Err(e) => {
                error!(site, err = %e, "news lookup failed");
                continue;
            }
        };
        for h in headlines {
            text.push_str(&format!("{}\n{}\n", h.title, h.url));
        }
    }

    if text.is_empty() {
        ctx.delivery
            .send(OutboundMessage::plain(msg.chat, "No news right now.").reply_to(msg.message_id))
            .await;
        return;
    }

    ctx.delivery
        .send(
            OutboundMessage::plain(msg.chat, text)
                .no_link_preview()
                .reply_to(msg.message_id),
        )
        .await;
}

async fn eng(ctx: &BotCtx, msg: &InboundMessage) {
    let text = msg.command_args();
    if text.is_empty() {
        ctx.delivery
            .send(OutboundMessage::plain(msg.chat, "Empty input text.").reply_to(msg.message_id))
            .await;
        return;
    }

    match ctx.completion.correct_grammar(text).await {
        Ok(ans) if !ans.is_empty() => {
            ctx.delivery
                .send(OutboundMessage::plain(msg.chat, ans).reply_to(msg.message_id))
                .await;
        }
        Ok(_) | Err(_) => {
            ctx.delivery
                .send(
                    OutboundMessage::plain(msg.chat, COMPLETION_APOLOGY)
                        .reply_to(msg.message_id),
                )
                .await;
        }
    }
}

async fn whoami(ctx: &BotCtx, msg: &InboundMessage) {
    let text = format!("ChatID: {}\nUserID: {}", msg.chat.0, msg.sender.0);
    ctx.delivery.send(OutboundMessage::plain(msg.chat, text)).await;
}

async fn digest(ctx: &BotCtx, msg: &InboundMessage) {
    let text = ctx.composer.compose().await;
    ctx.delivery
        .send(
            OutboundMessage::plain(msg.chat, text)
                .parse_mode(ParseMode::MarkdownV2)
                .no_link_preview(),
        )
        .await;
}

async fn revision(ctx: &BotCtx, msg: &InboundMessage) {
    let Some(rev) = ctx.cfg.revision.clone() else {
        return;
    };
    ctx.delivery
        .send(OutboundMessage::plain(msg.chat, rev).reply_to(msg.message_id))
        .await;
}

async fn add_chat(ctx: &BotCtx, msg: &InboundMessage) {
    let Some(chat_id) = require_admin_chat_arg(ctx, msg, "add").await else {
        return;
    };

    let reply = match ctx.store.add_chat(chat_id).await {
        Ok(()) => format!("Chat {chat_id} added to the allow-list."),
        Err(e) => {
            error!(chat_id, err = %e, "failed to add chat");
            "Failed to add the chat.".to_string()
        }
    };
    ctx.delivery
        .send(OutboundMessage::plain(msg.chat, reply).reply_to(msg.message_id))
        .await;
}

async fn remove_chat(ctx: &BotCtx, msg: &InboundMessage) {
    let Some(chat_id) = require_admin_chat_arg(ctx, msg, "remove").await else {
        return;
    };

    let reply = match ctx.store.remove_chat(chat_id).await {
        Ok(()) => format!("Chat {chat_id} removed from the allow-list."),
        Err(e) => {
            error!(chat_id, err = %e, "failed to remove chat");
            "Failed to remove the chat.".to_string()
        }
    };
    ctx.delivery
        .send(OutboundMessage::plain(msg.chat, reply).reply_to(msg.message_id))
        .await;
}

/// Admin gate + `<chatid>` argument parsing shared by `/add` and `/remove`.
async fn require_admin_chat_arg(
    ctx: &BotCtx,
    msg: &InboundMessage,
    verb: &str,
) -> Option<i64> {
    if !ctx.gate.is_admin(msg.sender) {
        ctx.delivery
            .send(OutboundMessage::plain(msg.chat, NOT_ALLOWED).reply_to(msg.message_id))
            .await;
        return None;
    }

    let arg = msg.command_args();
    if arg.is_empty() {
        ctx.delivery
            .send(
                OutboundMessage::plain(msg.chat, format!("Provide a chat id to {verb}."))
                    .reply_to(msg.message_id),
            )
            .await;
        return None;
    }

    match arg.parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            ctx.delivery
                .send(
                    OutboundMessage::plain(msg.chat, "Invalid chat id format.")
                        .reply_to(msg.message_id),
                )
                .await;
            None
        }
    }
}

async fn list_chats(ctx: &BotCtx, msg: &InboundMessage) {
    if !ctx.gate.is_admin(msg.sender) {
        ctx.delivery
            .send(OutboundMessage::plain(msg.chat, NOT_ALLOWED).reply_to(msg.message_id))
            .await;
        return;
    }

    let reply = match ctx.store.list_chats().await {
        Ok(chats) if chats.is_empty() => "The allow-list is empty.".to_string(),
        Ok(chats) => {
            let mut text = String::from("Allowed chats:\n");
            for chat in chats {
                text.push_str(&format!("• {chat}\n"));
            }
            text
        }
        Err(e) => {
            error!(err = %e, "failed to list chats");
            "Failed to read the allow-list.".to_string()
        }
    };
    ctx.delivery
        .send(OutboundMessage::plain(msg.chat, reply).reply_to(msg.message_id))
        .await;
}

async fn invite(ctx: &BotCtx, msg: &InboundMessage) {
    if !ctx.gate.is_admin(msg.sender) {
        ctx.delivery
            .send(OutboundMessage::plain(msg.chat, NOT_ALLOWED).reply_to(msg.message_id))
            .await;
        return;
    }

    let token = mint_invite_token();
    if let Err(e) = ctx.store.create_invite(&token).await {
        error!(err = %e, "failed to create invite token");
        ctx.delivery
            .send(
                OutboundMessage::plain(msg.chat, "Failed to create an invite token.")
                    .reply_to(msg.message_id),
            )
            .await;
        return;
    }

    let link = format!(
        "https://t.me/{}?start={token}",
        ctx.delivery.bot_username()
    );
    let hours = ctx.cfg.invite_ttl.as_secs() / 3600;
    let text = format!("Authorization link (valid for {hours} hours):\n{link}");
    ctx.delivery
        .send(OutboundMessage::plain(msg.chat, text).reply_to(msg.message_id))
        .await;
}

async fn start(ctx: &BotCtx, msg: &InboundMessage) {
    if !msg.is_private() {
        return;
    }

    let token = msg.command_args();
    if token.is_empty() {
        let text = format!(
            "Welcome! Ask an administrator for access. Chat ID: {}",
            msg.chat.0
        );
        ctx.delivery.send(OutboundMessage::plain(msg.chat, text)).await;
        return;
    }

    let valid = match ctx.store.consume_invite(token).await {
        Ok(v) => v,
        Err(e) => {
            error!(err = %e, "failed to validate invite token");
            ctx.delivery
                .send(OutboundMessage::plain(
                    msg.chat,
                    "Failed to validate the invite token.",
                ))
                .await;
            return;
        }
    };

    if !valid {
        ctx.delivery
            .send(OutboundMessage::plain(
                msg.chat,
                "Invalid or expired invite token.",
            ))
            .await;
        return;
    }

    if let Err(e) = ctx.store.add_chat(msg.chat.0).await {
        error!(chat = msg.chat.0, err = %e, "failed to authorize chat via invite");
        ctx.delivery
            .send(OutboundMessage::plain(msg.chat, "Failed to authorize the chat."))
            .await;
        return;
    }

    ctx.delivery
        .send(OutboundMessage::plain(
            msg.chat,
            "Authorization successful! You now have access to the bot.",
        ))
        .await;
}

async fn help(ctx: &BotCtx, msg: &InboundMessage) {
    let mut text = String::new();
    for cmd in commands::visible() {
        text.push_str(&format!("{} - {}\n", cmd.name, cmd.description));
    }
    let text = text.trim_end().to_string();
    if text.is_empty() {
        return;
    }

    ctx.delivery
        .send(OutboundMessage::plain(msg.chat, text).reply_to(msg.message_id))
        .await;
}

/// Voice notes: transcribe and echo the transcript.
pub async fn voice(ctx: Arc<BotCtx>, msg: InboundMessage) {
    let Some(voice) = msg.voice.as_ref() else {
        return;
    };

    match ctx.transcriber.transcribe_voice(&voice.file_id).await {
        Ok(text) => {
            ctx.delivery
                .send(OutboundMessage::plain(msg.chat, text).reply_to(msg.message_id))
                .await;
        }
        Err(e) => {
            error!(chat = msg.chat.0, err = %e, "voice transcription failed");
            ctx.delivery
                .send(
                    OutboundMessage::plain(msg.chat, "Failed to process the voice message.")
                        .reply_to(msg.message_id),
                )
                .await;
        }
    }
}
