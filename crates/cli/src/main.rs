use std::{path::PathBuf, sync::Arc};

use {
    clap::Parser,
    secrecy::ExposeSecret,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    youtuply_bot::{ChatOutbound, InstanceRegistry, SettingsStore},
    youtuply_discord::DiscordOutbound,
    youtuply_oauth::{DeviceAuthFlow, TokenStore},
    youtuply_youtube::PlaylistClient,
};

#[derive(Parser)]
#[command(
    name = "youtuply",
    about = "Discord bot that collects YouTube links into playlists"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Explicit config file (skips the standard search locations).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Custom data directory for settings and token records.
    #[arg(long, env = "YOUTUPLY_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let mut config = match &cli.config {
        Some(path) => youtuply_config::load_config(path)?,
        None => youtuply_config::discover_and_load(),
    };
    youtuply_config::apply_env_overrides(&mut config);
    if let Some(dir) = &cli.data_dir {
        youtuply_config::set_data_dir(dir.clone());
    }

    let Some(token) = config.discord.token.clone() else {
        anyhow::bail!(
            "no Discord token configured; set YOUTUPLY_DISCORD_TOKEN or [discord] token"
        );
    };
    if config.youtube.oauth.client_id.is_empty() {
        anyhow::bail!(
            "no OAuth client id configured; set YOUTUPLY_OAUTH_CLIENT_ID or [youtube.oauth] client_id"
        );
    }

    let data_dir = youtuply_config::data_dir(&config);
    std::fs::create_dir_all(&data_dir)
        .map_err(|e| anyhow::anyhow!("cannot create data dir {}: {e}", data_dir.display()))?;
    info!(data_dir = %data_dir.display(), "youtuply starting");

    let tokens = Arc::new(TokenStore::new(data_dir.join("tokens")));
    let auth = Arc::new(DeviceAuthFlow::new(
        config.youtube.oauth.clone(),
        Arc::clone(&tokens),
    ));
    let playlists = Arc::new(PlaylistClient::new(
        config.youtube.api_base.clone(),
        tokens,
        Arc::clone(&auth),
    ));
    let store = Arc::new(SettingsStore::new(data_dir.join("instances")));
    let outbound = Arc::new(DiscordOutbound::new());
    let registry = Arc::new(InstanceRegistry::new(
        store,
        Arc::clone(&outbound) as Arc<dyn ChatOutbound>,
        playlists,
        auth,
    ));

    youtuply_discord::run(token.expose_secret(), registry, outbound).await?;
    Ok(())
}
