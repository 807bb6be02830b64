//! The static command registry.
//!
//! The registry is immutable at runtime; handlers are identified by
//! [`CommandKind`] and executed by the dispatcher. Hidden commands are
//! excluded from `/help` and from the command list registered with the
//! transport.

/// What a matched command does. The dispatcher maps this to a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Ping,
    Weather,
    Gpt,
    NewChat,
    News,
    Eng,
    WhoAmI,
    Digest,
    Revision,
    AddChat,
    RemoveChat,
    ListChats,
    Invite,
    Start,
    Help,
}

#[derive(Clone, Copy, Debug)]
pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub hidden: bool,
    pub kind: CommandKind,
}

pub const COMMANDS: &[Command] = &[
    Command {
        name: "/ping",
        description: "Check that the bot is alive.",
        hidden: false,
        kind: CommandKind::Ping,
    },
    Command {
        name: "/weather",
        description: "Weather forecast for the configured cities.",
        hidden: false,
        kind: CommandKind::Weather,
    },
    Command {
        name: "/gpt",
        description: "Ask the assistant (keeps short-term context).",
        hidden: false,
        kind: CommandKind::Gpt,
    },
    Command {
        name: "/new",
        description: "Forget the assistant conversation context.",
        hidden: false,
        kind: CommandKind::NewChat,
    },
    Command {
        name: "/restart",
        description: "Forget the assistant conversation context.",
        hidden: true,
        kind: CommandKind::NewChat,
    },
    Command {
        name: "/news",
        description: "Latest headlines from the configured sources.",
        hidden: false,
        kind: CommandKind::News,
    },
    Command {
        name: "/eng",
        description: "Correct grammar and style of an English text.",
        hidden: false,
        kind: CommandKind::Eng,
    },
    Command {
        name: "/help",
        description: "List available commands.",
        hidden: false,
        kind: CommandKind::Help,
    },
    Command {
        name: "/whoami",
        description: "Show your chat id and user id.",
        hidden: true,
        kind: CommandKind::WhoAmI,
    },
    Command {
        name: "/digest",
        description: "Compose the morning digest now.",
        hidden: true,
        kind: CommandKind::Digest,
    },
    Command {
        name: "/revision",
        description: "Show the deployed revision.",
        hidden: true,
        kind: CommandKind::Revision,
    },
    Command {
        name: "/add",
        description: "Add a chat id to the allow-list.",
        hidden: true,
        kind: CommandKind::AddChat,
    },
    Command {
        name: "/remove",
        description: "Remove a chat id from the allow-list.",
        hidden: true,
        kind: CommandKind::RemoveChat,
    },
    Command {
        name: "/users",
        description: "List allowed chat ids.",
        hidden: true,
        kind: CommandKind::ListChats,
    },
    Command {
        name: "/invite",
        description: "Mint a single-use invite link.",
        hidden: true,
        kind: CommandKind::Invite,
    },
    Command {
        name: "/start",
        description: "Self-register with an invite token.",
        hidden: true,
        kind: CommandKind::Start,
    },
];

/// Look up a command by the message's leading token.
///
/// The match is case-sensitive and exact on the canonical name; an
/// `@botname` suffix on the token (how Telegram addresses commands in
/// groups) is tolerated and ignored.
pub fn find(token: &str) -> Option<&'static Command> {
    if !token.starts_with('/') {
        return None;
    }
    let base = token.split('@').next().unwrap_or(token);
    COMMANDS.iter().find(|c| c.name == base)
}

/// The visible part of the registry, for `/help` and transport registration.
pub fn visible() -> impl Iterator<Item = &'static Command> {
    COMMANDS.iter().filter(|c| !c.hidden)
}
