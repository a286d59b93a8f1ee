//! Command handlers for the Telegram bot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tailbot_tailnet::DeviceSource;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::auth::{AuthDecision, AuthorizationGate};
use crate::config::{BotConfig, MessagePolicy};
use crate::delivery::{deliver_all, report_failure, report_unhandled, schedule_delete};
use crate::error::HandlerError;
use crate::incoming::IncomingMessage;
use crate::messenger::{Messenger, OutgoingMessage};
use crate::report::format_device_status;
use crate::timeout::race_timeout;

pub const WELCOME: &str =
    "*Welcome!* ✨\n_This is a private utility bot for checking Tailscale devices._";
pub const HELP: &str = "*Tailbot*\n\n_This is a utility bot for managing Tailscale.\nUnauthorized use is not permitted._";
pub const COMMANDS: &str = "*Commands*\n\n_1. /list List devices_";
pub const NOT_AUTHORIZED: &str = "*You are not authorized to use this command.*";
pub const NO_BOT_ACCESS: &str = "_You don't have authorization to use this bot._";
pub const PRIVATE_ONLY: &str = "*This bot only works in private chats.*";
pub const COMMANDS_ONLY: &str = "*Only commands are supported.*\n_Use /help to see what this bot can do._";
pub const PLACEHOLDER: &str = "*Downloading*";
pub const PROCESSING: &str = "Processing";

/// How long the status placeholder stays visible.
pub const PLACEHOLDER_LIFETIME: Duration = Duration::from_millis(3000);

/// How long a message reply may take before the caller gives up on it.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(7);

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "About this bot")]
    Help,

    #[command(description = "List privileged commands")]
    Cmd,

    #[command(description = "List tailnet devices and their status")]
    List,

    #[command(hide)]
    L,

    #[command(hide)]
    Ls,
}

impl Command {
    /// Whether the command needs an authorized identity.
    pub fn is_privileged(&self) -> bool {
        !matches!(self, Command::Start | Command::Help)
    }
}

/// Where an update was routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Command(Command),
    /// Started with `/` but matched no command.
    UnknownCommand,
    /// Anything that is not a command.
    Message,
}

/// Everything a handler needs, passed explicitly.
#[derive(Clone)]
pub struct BotContext {
    pub messenger: Arc<dyn Messenger>,
    pub devices: Arc<dyn DeviceSource>,
    pub gate: Arc<AuthorizationGate>,
    pub message_policy: MessagePolicy,
}

impl BotContext {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        devices: Arc<dyn DeviceSource>,
        gate: AuthorizationGate,
        message_policy: MessagePolicy,
    ) -> Self {
        Self {
            messenger,
            devices,
            gate: Arc::new(gate),
            message_policy,
        }
    }

    pub fn from_config(
        config: &BotConfig,
        messenger: Arc<dyn Messenger>,
        devices: Arc<dyn DeviceSource>,
    ) -> Self {
        Self::new(
            messenger,
            devices,
            AuthorizationGate::from_config(config),
            config.message_policy,
        )
    }

    async fn reply(&self, msg: &IncomingMessage, message: OutgoingMessage) -> Result<(), HandlerError> {
        self.messenger.send(msg.chat_id, message).await?;
        Ok(())
    }

    /// Run the gate and send the matching notice on rejection.
    async fn authorize(
        &self,
        msg: &IncomingMessage,
        denied: OutgoingMessage,
    ) -> Result<bool, HandlerError> {
        match self.gate.check(msg) {
            AuthDecision::Allowed => Ok(true),
            AuthDecision::UnsupportedChat => {
                info!(chat_id = msg.chat_id, chat_type = ?msg.chat_type, "Rejected non-private chat");
                self.reply(msg, OutgoingMessage::markdown(PRIVATE_ONLY)).await?;
                Ok(false)
            }
            AuthDecision::Denied(identity) => {
                warn!(identity = ?identity, chat_id = msg.chat_id, "Unauthorized use");
                self.reply(msg, denied).await?;
                Ok(false)
            }
        }
    }
}

/// Handle one routed update. Never fails: errors the handlers leave
/// unhandled go to the fallback reporter.
pub async fn handle_update(ctx: &BotContext, msg: &IncomingMessage, route: Route) {
    let result = match route {
        Route::Command(cmd) => handle_command(ctx, msg, cmd).await,
        Route::UnknownCommand => handle_unknown_command(ctx, msg).await,
        Route::Message => handle_message(ctx, msg).await,
    };

    if let Err(e) = result {
        report_unhandled(ctx.messenger.as_ref(), msg, &e).await;
    }
}

/// Dispatch a parsed command.
pub async fn handle_command(
    ctx: &BotContext,
    msg: &IncomingMessage,
    cmd: Command,
) -> Result<(), HandlerError> {
    debug!(chat_id = msg.chat_id, command = ?cmd, "Handling command");

    if cmd.is_privileged()
        && !ctx
            .authorize(msg, OutgoingMessage::markdown(NOT_AUTHORIZED))
            .await?
    {
        return Ok(());
    }

    match cmd {
        Command::Start => handle_start(ctx, msg).await,
        Command::Help => handle_help(ctx, msg).await,
        Command::Cmd => handle_cmd(ctx, msg).await,
        Command::List | Command::L | Command::Ls => handle_list(ctx, msg).await,
    }
}

/// Handle the /start command.
async fn handle_start(ctx: &BotContext, msg: &IncomingMessage) -> Result<(), HandlerError> {
    ctx.reply(msg, OutgoingMessage::markdown(WELCOME)).await?;
    info!(chat_id = msg.chat_id, user = ?msg.sender, "New user added");
    Ok(())
}

/// Handle the /help command.
async fn handle_help(ctx: &BotContext, msg: &IncomingMessage) -> Result<(), HandlerError> {
    ctx.reply(msg, OutgoingMessage::markdown(HELP)).await?;
    info!(chat_id = msg.chat_id, user_id = ?msg.sender_id(), "Help command sent");
    Ok(())
}

/// Handle the /cmd command.
async fn handle_cmd(ctx: &BotContext, msg: &IncomingMessage) -> Result<(), HandlerError> {
    ctx.reply(msg, OutgoingMessage::markdown(COMMANDS)).await?;
    info!(chat_id = msg.chat_id, user_id = ?msg.sender_id(), "Commands list sent");
    Ok(())
}

/// Handle /list: one status message per tailnet device.
///
/// A failed fetch is reported to the user and the handler still succeeds;
/// individual replies that fail are logged by the fan-out.
async fn handle_list(ctx: &BotContext, msg: &IncomingMessage) -> Result<(), HandlerError> {
    let devices = match ctx.devices.fetch_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            report_failure(ctx.messenger.as_ref(), msg, &HandlerError::Upstream(e)).await;
            return Ok(());
        }
    };

    let now = Utc::now();
    let replies = devices
        .iter()
        .map(|device| OutgoingMessage::html(format_device_status(device, now)))
        .collect();

    let summary = deliver_all(ctx.messenger.as_ref(), msg.chat_id, replies).await;
    info!(
        chat_id = msg.chat_id,
        devices = devices.len(),
        sent = summary.sent,
        failed = summary.failed,
        "Device status sent"
    );
    Ok(())
}

/// Whether `text` is a `/command@name` addressed to a bot other than
/// `bot_username`.
pub fn addressed_elsewhere(text: &str, bot_username: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or(text);
    match command.split_once('@') {
        Some((_, target)) => !target.eq_ignore_ascii_case(bot_username),
        None => false,
    }
}

/// Reply to an unrecognized command. Silent in chats the gate does not serve.
async fn handle_unknown_command(ctx: &BotContext, msg: &IncomingMessage) -> Result<(), HandlerError> {
    if !ctx.gate.accepts_chat(msg) {
        debug!(chat_id = msg.chat_id, chat_type = ?msg.chat_type, "Ignoring unknown command");
        return Ok(());
    }

    let text = msg.text.as_deref().unwrap_or_default();
    let name = text.split_whitespace().next().unwrap_or(text);
    info!(chat_id = msg.chat_id, cmd = %name, "Unrecognized command");
    ctx.reply(
        msg,
        OutgoingMessage::plain(format!(
            "Unknown command: {}\n\nUse /help to see available commands.",
            name
        )),
    )
    .await
}

/// Handle a non-command message according to the configured policy.
pub async fn handle_message(ctx: &BotContext, msg: &IncomingMessage) -> Result<(), HandlerError> {
    info!(
        chat_id = msg.chat_id,
        from = ?msg.sender.as_ref().map(|s| &s.name),
        username = ?msg.sender.as_ref().and_then(|s| s.username.as_deref()),
        user_id = ?msg.sender_id(),
        text = ?msg.text,
        "Message received"
    );

    match ctx.message_policy {
        MessagePolicy::Reject => {
            ctx.reply(msg, OutgoingMessage::markdown(COMMANDS_ONLY).reply_to(msg.message_id))
                .await
        }
        MessagePolicy::Process => {
            let denied = OutgoingMessage::markdown(NO_BOT_ACCESS).reply_to(msg.message_id);
            if !ctx.authorize(msg, denied).await? {
                return Ok(());
            }
            if let Err(e) = process_message(ctx, msg).await {
                report_failure(ctx.messenger.as_ref(), msg, &e).await;
            }
            Ok(())
        }
    }
}

/// Post a short-lived placeholder, then reply within [`REPLY_TIMEOUT`].
///
/// On timeout the reply is not cancelled; it may still arrive after the
/// timeout has been reported.
async fn process_message(ctx: &BotContext, msg: &IncomingMessage) -> Result<(), HandlerError> {
    let placeholder = ctx
        .messenger
        .send(msg.chat_id, OutgoingMessage::markdown(PLACEHOLDER))
        .await?;
    schedule_delete(
        Arc::clone(&ctx.messenger),
        msg.chat_id,
        placeholder.message_id,
        PLACEHOLDER_LIFETIME,
    );

    let messenger = Arc::clone(&ctx.messenger);
    let chat_id = msg.chat_id;
    let reply = OutgoingMessage::markdown(PROCESSING).reply_to(msg.message_id);
    race_timeout(REPLY_TIMEOUT, async move { messenger.send(chat_id, reply).await }).await??;

    info!(chat_id, user_id = ?msg.sender_id(), "Function executed successfully");
    Ok(())
}
