//! Error types for the Telegram bot.

use tailbot_tailnet::TailnetError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::messenger::{DeliveryError, DeliveryErrorKind};
use crate::timeout::TimedOut;

/// Errors that stop the bot from starting or serving.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Required configuration missing or malformed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to start the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Webhook registration failed.
    #[error("Failed to register webhook: {0}")]
    WebhookFailed(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

/// Errors raised while handling a single update.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Telegram refused or never received a message.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// The Tailscale API call failed.
    #[error(transparent)]
    Upstream(#[from] TailnetError),

    /// A raced operation did not finish in time.
    #[error("Function execution timed out.")]
    TimedOut,
}

impl HandlerError {
    /// Delivery classification, if this is a delivery failure.
    pub fn delivery_kind(&self) -> Option<DeliveryErrorKind> {
        match self {
            HandlerError::Delivery(e) => Some(e.kind),
            _ => None,
        }
    }
}

impl From<TimedOut> for HandlerError {
    fn from(_: TimedOut) -> Self {
        HandlerError::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_kind() {
        let err = HandlerError::from(DeliveryError::new(
            DeliveryErrorKind::BlockedByUser,
            "Forbidden: bot was blocked by the user",
        ));
        assert_eq!(err.delivery_kind(), Some(DeliveryErrorKind::BlockedByUser));
        assert_eq!(HandlerError::TimedOut.delivery_kind(), None);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            HandlerError::TimedOut.to_string(),
            "Function execution timed out."
        );
        let upstream = HandlerError::from(TailnetError::Network("connection refused".into()));
        assert_eq!(upstream.to_string(), "network error: connection refused");
    }
}
