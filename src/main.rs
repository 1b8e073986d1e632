//! VRChat video URL to OBS relay.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vrchat_obs_relay::config::{parse_extra_settings, RelayConfig};
use vrchat_obs_relay::obs::{InputControl, ObsClient};
use vrchat_obs_relay::relay::{Publisher, Reconciler, Relay};

#[derive(Parser)]
#[command(
    name = "vrchat-obs-relay",
    about = "Relay VRChat video player URLs into an OBS media source",
    version
)]
struct Cli {
    /// OBS WebSocket host.
    #[arg(long, default_value = "localhost")]
    obs_host: String,

    /// OBS WebSocket port.
    #[arg(long, default_value_t = 4455)]
    obs_port: u16,

    /// OBS WebSocket password.
    #[arg(long)]
    obs_password: Option<String>,

    /// OBS input source name.
    #[arg(long, default_value = "VRChatFeed")]
    input_name: String,

    /// Protocol to replace rtspt with.
    #[arg(long, default_value = "rtmp")]
    rtspt_replacement: String,

    /// Extra input settings, comma-separated key=value pairs.
    #[arg(long, default_value = "")]
    obs_settings: String,

    /// VRChat log directory (defaults to the platform location).
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Seconds between checks for a newer log file.
    #[arg(long, default_value_t = 5)]
    poll_interval: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = RelayConfig {
        obs_host: cli.obs_host,
        obs_port: cli.obs_port,
        obs_password: cli.obs_password,
        input_name: cli.input_name,
        rtspt_replacement: cli.rtspt_replacement,
        extra_settings: parse_extra_settings(&cli.obs_settings),
        log_dir: cli.log_dir,
        poll_interval: Duration::from_secs(cli.poll_interval),
    };

    tracing::info!(
        obs_host = %config.obs_host,
        obs_port = config.obs_port,
        input_name = %config.input_name,
        rtspt_replacement = %config.rtspt_replacement,
        "Starting VRChat URL to OBS relay"
    );

    // Single connect attempt; an unreachable OBS degrades to log-only.
    let client = match ObsClient::connect(
        &config.obs_host,
        config.obs_port,
        config.obs_password.as_deref(),
    )
    .await
    {
        Ok(client) => {
            tracing::info!(
                host = %config.obs_host,
                port = config.obs_port,
                "Connected to OBS WebSocket"
            );
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to connect to OBS WebSocket");
            tracing::warn!(
                "Continuing to monitor VRChat logs without updating OBS. \
                 Make sure OBS Studio is running with the WebSocket server enabled."
            );
            None
        }
    };

    let control: Option<Arc<dyn InputControl>> = match &client {
        Some(client) => Some(Arc::clone(client) as Arc<dyn InputControl>),
        None => None,
    };
    let publisher = Publisher::new(
        control,
        config.input_name.clone(),
        config.extra_settings.clone(),
    );
    let reconciler = Reconciler::new(publisher, config.rtspt_replacement.clone());

    let mut relay = match Relay::new(&config, reconciler) {
        Ok(relay) => relay,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize relay");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received shutdown signal");
                cancel.cancel();
            }
        });
    }

    if let Err(e) = relay.run(cancel).await {
        tracing::error!(error = %e, "Relay failed");
        std::process::exit(1);
    }

    if let Some(client) = client {
        client.close().await;
    }
}
