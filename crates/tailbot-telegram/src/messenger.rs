//! Outbound messaging capability and delivery failure classification.
//!
//! Handlers never touch the teloxide `Bot` directly. They receive a
//! [`Messenger`], and every failure it reports has already been classified
//! into a [`DeliveryErrorKind`].

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, ReplyParameters};
use teloxide::{ApiError, RequestError};
use thiserror::Error;

/// How Telegram should render a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    PlainText,
    Markdown,
    Html,
}

impl MessageFormat {
    /// Telegram parse mode, `None` for plain text.
    #[allow(deprecated)] // legacy Markdown keeps the fixed texts free of V2 escaping
    pub fn parse_mode(self) -> Option<ParseMode> {
        match self {
            MessageFormat::PlainText => None,
            MessageFormat::Markdown => Some(ParseMode::Markdown),
            MessageFormat::Html => Some(ParseMode::Html),
        }
    }
}

/// A message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub format: MessageFormat,
    /// Message to quote.
    pub reply_to: Option<i32>,
}

impl OutgoingMessage {
    pub fn new(text: impl Into<String>, format: MessageFormat) -> Self {
        Self {
            text: text.into(),
            format,
            reply_to: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, MessageFormat::PlainText)
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self::new(text, MessageFormat::Markdown)
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self::new(text, MessageFormat::Html)
    }

    /// Send as a reply to `message_id`.
    pub fn reply_to(mut self, message_id: i32) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// A message Telegram accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Why a message could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryErrorKind {
    /// The recipient blocked the bot.
    BlockedByUser,
    /// Telegram could not be reached.
    Transport,
    /// Telegram answered with any other error.
    Other,
}

/// A failed send or delete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DeliveryError {
    pub kind: DeliveryErrorKind,
    pub message: String,
}

impl DeliveryError {
    pub fn new(kind: DeliveryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<RequestError> for DeliveryError {
    fn from(e: RequestError) -> Self {
        let kind = match &e {
            RequestError::Api(ApiError::BotBlocked) => DeliveryErrorKind::BlockedByUser,
            RequestError::Network(_) | RequestError::Io(_) => DeliveryErrorKind::Transport,
            _ => DeliveryErrorKind::Other,
        };
        DeliveryError::new(kind, e.to_string())
    }
}

/// Capability to send and delete chat messages.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a message to a chat. Attempted exactly once.
    async fn send(
        &self,
        chat_id: i64,
        message: OutgoingMessage,
    ) -> Result<SentMessage, DeliveryError>;

    /// Delete a previously sent message.
    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<(), DeliveryError>;
}

/// [`Messenger`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(
        &self,
        chat_id: i64,
        message: OutgoingMessage,
    ) -> Result<SentMessage, DeliveryError> {
        let mut req = self.bot.send_message(ChatId(chat_id), message.text);
        if let Some(mode) = message.format.parse_mode() {
            req = req.parse_mode(mode);
        }
        if let Some(reply_to) = message.reply_to {
            req = req.reply_parameters(ReplyParameters::new(MessageId(reply_to)));
        }

        let sent = req.await?;
        Ok(SentMessage {
            chat_id,
            message_id: sent.id.0,
        })
    }

    async fn delete(&self, chat_id: i64, message_id: i32) -> Result<(), DeliveryError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await?;
        Ok(())
    }
}
