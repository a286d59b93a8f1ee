//! Allow-list authorization for privileged commands.

use std::collections::HashSet;

use crate::config::{AuthScope, BotConfig};
use crate::incoming::IncomingMessage;

/// Outcome of checking a message against the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    /// Private-only mode and the message came from a group or channel.
    UnsupportedChat,
    /// The identity is not on the allow-list. `None` when the message had no
    /// identity to check, e.g. an anonymous channel post under user scope.
    Denied(Option<i64>),
}

/// Decides whether an update may run privileged commands.
///
/// The allow-list is fixed at construction; revoking access means
/// restarting with a new configuration.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    allowed: HashSet<i64>,
    scope: AuthScope,
    private_only: bool,
}

impl AuthorizationGate {
    pub fn new(allowed: HashSet<i64>, scope: AuthScope, private_only: bool) -> Self {
        Self {
            allowed,
            scope,
            private_only,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            config.authorized.clone(),
            config.auth_scope,
            config.private_chats_only,
        )
    }

    /// Whether `identity` is on the allow-list.
    pub fn is_authorized(&self, identity: i64) -> bool {
        self.allowed.contains(&identity)
    }

    /// The identity checked for `msg` under the configured scope.
    pub fn identity_of(&self, msg: &IncomingMessage) -> Option<i64> {
        match self.scope {
            AuthScope::User => msg.sender_id(),
            AuthScope::Chat => Some(msg.chat_id),
        }
    }

    /// Whether the bot answers in the chat `msg` came from at all.
    pub fn accepts_chat(&self, msg: &IncomingMessage) -> bool {
        !self.private_only || msg.is_private()
    }

    /// Check a message. The chat type restriction runs before the allow-list.
    pub fn check(&self, msg: &IncomingMessage) -> AuthDecision {
        if !self.accepts_chat(msg) {
            return AuthDecision::UnsupportedChat;
        }
        match self.identity_of(msg) {
            Some(id) if self.is_authorized(id) => AuthDecision::Allowed,
            identity => AuthDecision::Denied(identity),
        }
    }
}
