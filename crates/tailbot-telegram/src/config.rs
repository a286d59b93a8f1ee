//! Bot configuration, read once from the environment at startup.
//!
//! # Environment Variables
//!
//! Required:
//! - `BOT_TOKEN`: Bot token from @BotFather
//! - `BOT_DEVELOPER`: Comma-separated identities allowed to use privileged commands
//! - `TAILNET`: Tailnet name, e.g. `example.com`
//! - `TAILSCALE_API_KEY`: Tailscale API access token
//!
//! Optional:
//! - `TAILSCALE_API_BASE`: API host (default: `https://api.tailscale.com`)
//! - `AUTH_SCOPE`: `user` or `chat` (default: `user`)
//! - `PRIVATE_CHATS_ONLY`: Reject group and channel chats (default: `false`)
//! - `MESSAGE_POLICY`: `process` or `reject` for non-command messages (default: `process`)
//! - `WEBHOOK_URL`: Public webhook URL; polling is used when unset
//! - `WEBHOOK_PORT`: Local webhook port (default: 8443)
//! - `WEBHOOK_SECRET`: Secret token Telegram sends with webhook requests

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use tailbot_tailnet::TAILSCALE_API_BASE;
use thiserror::Error;
use url::Url;

pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";
pub const BOT_DEVELOPER_ENV: &str = "BOT_DEVELOPER";
pub const TAILNET_ENV: &str = "TAILNET";
pub const TAILSCALE_API_KEY_ENV: &str = "TAILSCALE_API_KEY";
pub const TAILSCALE_API_BASE_ENV: &str = "TAILSCALE_API_BASE";
pub const AUTH_SCOPE_ENV: &str = "AUTH_SCOPE";
pub const PRIVATE_CHATS_ONLY_ENV: &str = "PRIVATE_CHATS_ONLY";
pub const MESSAGE_POLICY_ENV: &str = "MESSAGE_POLICY";
pub const WEBHOOK_URL_ENV: &str = "WEBHOOK_URL";
pub const WEBHOOK_PORT_ENV: &str = "WEBHOOK_PORT";
pub const WEBHOOK_SECRET_ENV: &str = "WEBHOOK_SECRET";

/// Default webhook port.
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} not set")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid {var} value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which identity of an update the allow-list is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScope {
    /// The sending user.
    #[default]
    User,
    /// The chat the message was sent in.
    Chat,
}

impl FromStr for AuthScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(AuthScope::User),
            "chat" => Ok(AuthScope::Chat),
            other => Err(format!("expected 'user' or 'chat', got '{}'", other)),
        }
    }
}

/// How non-command messages are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessagePolicy {
    /// Authorized senders get a placeholder and a timed reply.
    #[default]
    Process,
    /// Every non-command message gets a fixed notice.
    Reject,
}

impl FromStr for MessagePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" => Ok(MessagePolicy::Process),
            "reject" => Ok(MessagePolicy::Reject),
            other => Err(format!("expected 'process' or 'reject', got '{}'", other)),
        }
    }
}

/// Complete bot configuration.
#[derive(Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub authorized: HashSet<i64>,
    pub tailnet: String,
    pub tailscale_api_key: String,
    pub tailscale_api_base: String,
    pub auth_scope: AuthScope,
    pub private_chats_only: bool,
    pub message_policy: MessagePolicy,
    pub webhook_url: Option<Url>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,
}

impl BotConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let bot_token = require(BOT_TOKEN_ENV)?;
        let authorized = parse_identities(&require(BOT_DEVELOPER_ENV)?)?;
        let tailnet = require(TAILNET_ENV)?;
        let tailscale_api_key = require(TAILSCALE_API_KEY_ENV)?;
        let tailscale_api_base =
            get(TAILSCALE_API_BASE_ENV).unwrap_or_else(|| TAILSCALE_API_BASE.to_string());

        let auth_scope = parse_var(AUTH_SCOPE_ENV, get(AUTH_SCOPE_ENV))?.unwrap_or_default();
        let message_policy =
            parse_var(MESSAGE_POLICY_ENV, get(MESSAGE_POLICY_ENV))?.unwrap_or_default();

        let private_chats_only = match get(PRIVATE_CHATS_ONLY_ENV) {
            Some(value) => parse_flag(PRIVATE_CHATS_ONLY_ENV, &value)?,
            None => false,
        };

        let webhook_url = get(WEBHOOK_URL_ENV)
            .map(|value| {
                Url::parse(&value).map_err(|e| ConfigError::Invalid {
                    var: WEBHOOK_URL_ENV,
                    value,
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let webhook_port = match get(WEBHOOK_PORT_ENV) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: WEBHOOK_PORT_ENV,
                value: value.clone(),
                reason: "expected a port number".to_string(),
            })?,
            None => DEFAULT_WEBHOOK_PORT,
        };

        Ok(Self {
            bot_token,
            authorized,
            tailnet,
            tailscale_api_key,
            tailscale_api_base,
            auth_scope,
            private_chats_only,
            message_policy,
            webhook_url,
            webhook_port,
            webhook_secret: get(WEBHOOK_SECRET_ENV),
        })
    }

    /// Local address the webhook server binds to.
    pub fn webhook_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.webhook_port))
    }
}

/// Parse a comma-separated list of numeric identities.
pub fn parse_identities(raw: &str) -> std::result::Result<HashSet<i64>, ConfigError> {
    let mut ids = HashSet::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part.parse::<i64>().map_err(|_| ConfigError::Invalid {
            var: BOT_DEVELOPER_ENV,
            value: raw.to_string(),
            reason: format!("'{}' is not a numeric id", part),
        })?;
        ids.insert(id);
    }
    if ids.is_empty() {
        return Err(ConfigError::Missing(BOT_DEVELOPER_ENV));
    }
    Ok(ids)
}

fn parse_var<T>(var: &'static str, value: Option<String>) -> std::result::Result<Option<T>, ConfigError>
where
    T: FromStr<Err = String>,
{
    value
        .map(|value| {
            value.parse().map_err(|reason| ConfigError::Invalid {
                var,
                value,
                reason,
            })
        })
        .transpose()
}

fn parse_flag(var: &'static str, value: &str) -> std::result::Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
