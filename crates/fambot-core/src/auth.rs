//! Per-message authorization.

use std::sync::Arc;

use tracing::error;

use crate::{
    commands::{self, CommandKind},
    domain::{ChatId, InboundMessage, UserId},
    store::AuthStore,
};

/// Decides whether a sender/chat may be served.
///
/// Policy, in order: the home group is always served; admins are served in
/// private chats; everyone else must be in the persisted allow-set. A store
/// failure counts as "not allowed" (fail-closed).
pub struct AuthGate {
    home_group: ChatId,
    admins: Vec<i64>,
    store: Arc<dyn AuthStore>,
}

impl AuthGate {
    pub fn new(home_group: ChatId, admins: Vec<i64>, store: Arc<dyn AuthStore>) -> Self {
        Self {
            home_group,
            admins,
            store,
        }
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user.0)
    }

    pub async fn is_authorized(&self, msg: &InboundMessage) -> bool {
        if msg.chat == self.home_group {
            return true;
        }

        if msg.is_private() && self.is_admin(msg.sender) {
            return true;
        }

        match self.store.is_chat_allowed(msg.chat.0).await {
            Ok(allowed) => allowed,
            Err(e) => {
                error!(chat = msg.chat.0, err = %e, "allow-set lookup failed");
                false
            }
        }
    }
}

/// Commands processed even for unauthorized chats, so a user can
/// self-register via an invite token and find out their chat id.
pub fn is_bootstrap(msg: &InboundMessage) -> bool {
    matches!(
        commands::find(msg.command_token()).map(|c| c.kind),
        Some(CommandKind::Start) | Some(CommandKind::WhoAmI)
    )
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{ChatKind, MessageId},
        errors::Error,
        Result,
    };

    struct FixedStore {
        allowed: Vec<i64>,
        fail: bool,
    }

    #[async_trait]
    impl AuthStore for FixedStore {
        async fn add_chat(&self, _chat_id: i64) -> Result<()> {
            Ok(())
        }
        async fn remove_chat(&self, _chat_id: i64) -> Result<()> {
            Ok(())
        }
        async fn is_chat_allowed(&self, chat_id: i64) -> Result<bool> {
            if self.fail {
                return Err(Error::Store("down".to_string()));
            }
            Ok(self.allowed.contains(&chat_id))
        }
        async fn list_chats(&self) -> Result<Vec<i64>> {
            Ok(self.allowed.clone())
        }
        async fn create_invite(&self, _token: &str) -> Result<()> {
            Ok(())
        }
        async fn consume_invite(&self, _token: &str) -> Result<bool> {
            Ok(false)
        }
    }

    fn gate(allowed: Vec<i64>, fail: bool) -> AuthGate {
        AuthGate::new(
            ChatId(-100),
            vec![1],
            Arc::new(FixedStore { allowed, fail }),
        )
    }

    fn msg(chat: i64, kind: ChatKind, sender: i64, text: &str) -> InboundMessage {
        InboundMessage {
            chat: ChatId(chat),
            kind,
            sender: UserId(sender),
            message_id: MessageId(1),
            text: text.to_string(),
            voice: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn home_group_is_always_authorized() {
        let g = gate(vec![], false);
        assert!(g.is_authorized(&msg(-100, ChatKind::Group, 99, "hi")).await);
    }

    #[tokio::test]
    async fn admin_is_authorized_in_private_chat() {
        let g = gate(vec![], false);
        assert!(g.is_authorized(&msg(55, ChatKind::Private, 1, "hi")).await);
    }

    #[tokio::test]
    async fn admin_in_foreign_group_still_needs_the_allow_set() {
        let g = gate(vec![], false);
        assert!(!g.is_authorized(&msg(-200, ChatKind::Group, 1, "hi")).await);
    }

    #[tokio::test]
    async fn allow_set_members_are_authorized() {
        let g = gate(vec![77], false);
        assert!(g.is_authorized(&msg(77, ChatKind::Private, 9, "hi")).await);
        assert!(!g.is_authorized(&msg(78, ChatKind::Private, 9, "hi")).await);
    }

    #[tokio::test]
    async fn store_failure_is_fail_closed() {
        let g = gate(vec![77], true);
        assert!(!g.is_authorized(&msg(77, ChatKind::Private, 9, "hi")).await);
    }

    #[test]
    fn start_and_whoami_bypass_the_gate() {
        assert!(is_bootstrap(&msg(1, ChatKind::Private, 2, "/start abc")));
        assert!(is_bootstrap(&msg(1, ChatKind::Private, 2, "/whoami")));
        assert!(is_bootstrap(&msg(1, ChatKind::Private, 2, "/start@mybot")));
        assert!(!is_bootstrap(&msg(1, ChatKind::Private, 2, "/ping")));
        assert!(!is_bootstrap(&msg(1, ChatKind::Private, 2, "hello")));
    }
}
