use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rconbridge::discord::{self, DiscordPlatform};
use rconbridge::prelude::*;
use tracing_subscriber::EnvFilter;
use twilight_gateway::{Shard, ShardId};

/// Bridges DayZ BattlEye RCon chat and moderation to Discord.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Discord bot token.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: String,

    /// Per-guild bridge config file.
    #[arg(long, env = "RCONBRIDGE_CONFIG", default_value = "bridges.json")]
    config: PathBuf,

    /// Command prefix.
    #[arg(long, env = "RCONBRIDGE_PREFIX", default_value = ")")]
    prefix: String,

    /// Name used in game for messages typed in a debug channel.
    #[arg(long, env = "RCONBRIDGE_MODERATOR_ALIAS", default_value = "Big Brother")]
    moderator_alias: String,

    /// User ids allowed to run initialize-bridge and reconnect
    /// (comma separated). Anyone may when empty.
    #[arg(long = "operator", env = "RCONBRIDGE_OPERATORS", value_delimiter = ',')]
    operators: Vec<UserId>,
}

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rconbridge=info")),
        )
        .init();

    let args = Args::parse();
    if args.operators.is_empty() {
        tracing::warn!("no operators configured, anyone can run initialize-bridge and reconnect");
    }

    let http = Arc::new(twilight_http::Client::new(args.token.clone()));
    let shard = Shard::new(ShardId::ONE, args.token, discord::intents());
    let platform = Arc::new(DiscordPlatform::new(http, shard.sender()));

    let settings = AppSettings {
        relay: RelaySettings {
            command_prefix: args.prefix,
            moderator_alias: args.moderator_alias,
        },
        operators: args.operators,
        ..AppSettings::default()
    };
    let app = Arc::new(App::new(
        BattlEyeConnector,
        platform,
        ConfigStore::new(args.config),
        settings,
    ));
    app.start().await?;

    tokio::select! {
        () = discord::run_gateway(shard, Arc::clone(&app)) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("interrupted, shutting down");
        }
    }

    app.shutdown().await;
    Ok(())
}
