//! Transport-independent view of an incoming Telegram message.

use teloxide::types::{Message, Update};

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// The user who sent a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    /// First and last name joined.
    pub name: String,
    pub username: Option<String>,
}

/// The parts of an update the handlers need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub update_id: u32,
    pub message_id: i32,
    pub chat_id: i64,
    pub chat_type: ChatType,
    /// Absent for channel posts.
    pub sender: Option<Sender>,
    pub text: Option<String>,
}

impl IncomingMessage {
    /// Extract the handler view from a teloxide update and its message.
    pub fn from_update(update: &Update, msg: &Message) -> Self {
        let chat_type = if msg.chat.is_private() {
            ChatType::Private
        } else if msg.chat.is_group() {
            ChatType::Group
        } else if msg.chat.is_supergroup() {
            ChatType::Supergroup
        } else {
            ChatType::Channel
        };

        Self {
            update_id: update.id.0,
            message_id: msg.id.0,
            chat_id: msg.chat.id.0,
            chat_type,
            sender: msg.from.as_ref().map(|user| Sender {
                id: user.id.0 as i64,
                name: user.full_name(),
                username: user.username.clone(),
            }),
            text: msg.text().map(str::to_string),
        }
    }

    pub fn sender_id(&self) -> Option<i64> {
        self.sender.as_ref().map(|s| s.id)
    }

    /// Whether the message came from a one-to-one chat.
    pub fn is_private(&self) -> bool {
        self.chat_type == ChatType::Private
    }
}
