//! Main Telegram bot implementation.

use std::sync::Arc;

use tailbot_tailnet::TailnetClient;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::Me;
use teloxide::update_listeners::webhooks;
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::error::{Result, TelegramError};
use crate::handlers::{addressed_elsewhere, handle_update, BotContext, Command, Route};
use crate::incoming::IncomingMessage;
use crate::messenger::TelegramMessenger;
use crate::webhook::health_router;

/// The tailnet status bot.
pub struct TailBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Handler dependencies.
    ctx: Arc<BotContext>,
    config: BotConfig,
}

impl TailBot {
    /// Create the bot and its collaborators from configuration.
    pub fn new(config: BotConfig) -> Self {
        let bot = Bot::new(&config.bot_token);
        let devices = TailnetClient::new(&config.tailnet, &config.tailscale_api_key)
            .with_base_url(&config.tailscale_api_base);
        let ctx = BotContext::from_config(
            &config,
            Arc::new(TelegramMessenger::new(bot.clone())),
            Arc::new(devices),
        );

        Self {
            bot,
            ctx: Arc::new(ctx),
            config,
        }
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| TelegramError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Serve with a webhook when one is configured, otherwise poll.
    pub async fn start(&self) -> Result<()> {
        if self.config.webhook_url.is_some() {
            self.start_webhook().await
        } else {
            self.start_polling().await
        }
    }

    /// Start the bot in polling mode.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        // A webhook left over from an earlier run blocks getUpdates.
        if let Err(e) = self.bot.delete_webhook().await {
            warn!(error = %e, "Failed to clear webhook");
        }

        Dispatcher::builder(self.bot.clone(), schema(Arc::clone(&self.ctx)))
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }

    /// Start the bot behind a webhook, with `/health` on the same server.
    pub async fn start_webhook(&self) -> Result<()> {
        let url = self
            .config
            .webhook_url
            .clone()
            .ok_or_else(|| TelegramError::WebhookFailed("WEBHOOK_URL not set".to_string()))?;
        let address = self.config.webhook_address();
        info!(url = %url, address = %address, "Starting Telegram bot with webhook...");

        let mut options = webhooks::Options::new(address, url);
        if let Some(secret) = &self.config.webhook_secret {
            options = options.secret_token(secret.clone());
        }

        let (listener, stop_flag, router) = webhooks::axum_to_router(self.bot.clone(), options)
            .await
            .map_err(|e| TelegramError::WebhookFailed(e.to_string()))?;
        let app = router.merge(health_router());

        let tcp = tokio::net::TcpListener::bind(address).await?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(tcp, app)
                .with_graceful_shutdown(stop_flag)
                .await
            {
                error!(error = %e, "Webhook server failed");
            }
        });

        Dispatcher::builder(self.bot.clone(), schema(Arc::clone(&self.ctx)))
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;

        Ok(())
    }
}

/// Route message updates to commands, unknown commands and plain messages.
fn schema(ctx: Arc<BotContext>) -> UpdateHandler<teloxide::RequestError> {
    let ctx_for_commands = Arc::clone(&ctx);
    let ctx_for_unknown = Arc::clone(&ctx);
    let ctx_for_messages = ctx;

    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(move |upd: Update, msg: Message, cmd: Command| {
                    let ctx = Arc::clone(&ctx_for_commands);
                    info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
                    async move {
                        let incoming = IncomingMessage::from_update(&upd, &msg);
                        handle_update(&ctx, &incoming, Route::Command(cmd)).await;
                        respond(())
                    }
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| {
                    msg.text().map(|t| t.starts_with('/')).unwrap_or(false)
                })
                .endpoint(move |upd: Update, msg: Message, me: Me| {
                    let ctx = Arc::clone(&ctx_for_unknown);
                    async move {
                        let text = msg.text().unwrap_or_default();
                        if addressed_elsewhere(text, me.username()) {
                            debug!(chat_id = %msg.chat.id, cmd = %text, "Command addressed to another bot");
                            return respond(());
                        }
                        let incoming = IncomingMessage::from_update(&upd, &msg);
                        handle_update(&ctx, &incoming, Route::UnknownCommand).await;
                        respond(())
                    }
                }),
        )
        .branch(
            Update::filter_message().endpoint(move |upd: Update, msg: Message| {
                let ctx = Arc::clone(&ctx_for_messages);
                async move {
                    let incoming = IncomingMessage::from_update(&upd, &msg);
                    handle_update(&ctx, &incoming, Route::Message).await;
                    respond(())
                }
            }),
        )
}
