//! Tailbot binary.
//!
//! Start the bot with:
//! ```bash
//! BOT_TOKEN=xxx BOT_DEVELOPER=123 TAILNET=example.com TAILSCALE_API_KEY=tskey-xxx \
//!     cargo run -p tailbot-telegram
//! ```

use clap::Parser;
use tailbot_telegram::{BotConfig, TailBot};
use tracing_subscriber::EnvFilter;

/// Tailbot - Tailscale device status on Telegram
#[derive(Parser, Debug)]
#[command(name = "tailbot")]
#[command(about = "Telegram bot reporting Tailscale device status")]
struct Args {
    /// Poll for updates even when WEBHOOK_URL is set
    #[arg(long)]
    polling: bool,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Try local .env.local or .env
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    // Initialize logging based on verbosity
    let filter = match args.verbose {
        0 => "tailbot_telegram=info,tailbot_tailnet=info,teloxide=warn",
        1 => "tailbot_telegram=debug,tailbot_tailnet=debug,teloxide=info",
        2 => "tailbot_telegram=trace,tailbot_tailnet=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    let use_webhook = config.webhook_url.is_some() && !args.polling;

    tracing::info!(
        tailnet = %config.tailnet,
        authorized = config.authorized.len(),
        scope = ?config.auth_scope,
        "Configuration loaded"
    );

    let bot = TailBot::new(config);

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\n[robot] Tailbot");
            println!("   Bot: @{}", username);
            println!("   Mode: {}", if use_webhook { "webhook" } else { "polling" });
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("   Press Ctrl+C to stop\n");

    if args.polling {
        bot.start_polling().await?;
    } else {
        bot.start().await?;
    }

    Ok(())
}
