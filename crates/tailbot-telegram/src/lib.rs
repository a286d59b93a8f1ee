//! Telegram bot reporting the status of devices on a Tailscale tailnet.
//!
//! Authorized developers send `/list` and get one message per device showing
//! whether it is connected, its tailnet addresses and when it was last seen
//! (rendered in Indian Standard Time).
//!
//! # Commands
//!
//! - `/start` - Welcome message
//! - `/help` - About this bot
//! - `/cmd` - List privileged commands (authorized only)
//! - `/list`, `/l`, `/ls` - Device status report (authorized only)
//!
//! Configuration is read from the environment; see [`config`].
//!
//! # Example
//!
//! ```no_run
//! use tailbot_telegram::{BotConfig, TailBot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig::from_env()?;
//!     let bot = TailBot::new(config);
//!
//!     // Webhook when WEBHOOK_URL is set, polling otherwise
//!     bot.start().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod bot;
pub mod config;
pub mod delivery;
pub mod error;
pub mod handlers;
pub mod incoming;
pub mod messenger;
pub mod report;
pub mod timeout;
pub mod webhook;

#[cfg(test)]
mod testing;

pub use auth::{AuthDecision, AuthorizationGate};
pub use bot::TailBot;
pub use config::{AuthScope, BotConfig, ConfigError, MessagePolicy};
pub use error::{HandlerError, Result, TelegramError};
pub use handlers::{handle_update, BotContext, Command, Route};
pub use incoming::{ChatType, IncomingMessage, Sender};
pub use messenger::{
    DeliveryError, DeliveryErrorKind, MessageFormat, Messenger, OutgoingMessage, SentMessage,
    TelegramMessenger,
};
