//! Web server command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use tracing::info;

use ggnext_core::BroadcastConfig;
use ggnext_web::AppState;

use super::StoreArgs;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3030")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Seconds between heartbeats on idle live views
    #[arg(long, default_value = "45")]
    pub heartbeat_secs: u64,

    /// Pending events a live view may buffer before it is disconnected
    #[arg(long, default_value = "256")]
    pub viewer_buffer: usize,

    /// Grant an API key at startup, as KEY=CHANNEL[,CHANNEL...] (repeatable)
    #[arg(long = "api-key", value_name = "KEY=CHANNELS")]
    pub api_keys: Vec<String>,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file used with --log
    #[arg(long, default_value = "ggnext.log")]
    pub log_file: PathBuf,
}

pub async fn execute(args: ServeArgs, store_args: &StoreArgs) -> Result<()> {
    if args.heartbeat_secs == 0 {
        return Err(anyhow!("--heartbeat-secs must be at least 1"));
    }

    let grants = args
        .api_keys
        .iter()
        .map(|grant| parse_grant(grant))
        .collect::<Result<Vec<_>>>()?;

    let store = store_args.open().await?;
    for (key, channels) in &grants {
        store.grant_key(key, channels).await?;
    }
    if !grants.is_empty() {
        info!(keys = grants.len(), "Granted API keys from the command line");
    }

    let config = BroadcastConfig {
        heartbeat_interval: Duration::from_secs(args.heartbeat_secs),
        connection_buffer: args.viewer_buffer,
    };
    let state = AppState::new(store, config);

    println!();
    println!("  {} {}", "ggNext".cyan().bold(), "Queue Server".bold());
    println!();
    println!(
        "  {}    {}",
        "Store".green(),
        if store_args.memory {
            "in-memory".to_string()
        } else {
            store_args.redis_url.clone()
        }
    );
    println!(
        "  {}  http://{}:{}/channel/<channel>/challenge",
        "Chat bot".green(),
        args.host,
        args.port
    );
    println!(
        "  {}     http://{}:{}/channel/<channel>/queue",
        "Live".green(),
        args.host,
        args.port
    );
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    ggnext_web::run_server(state, &args.host, args.port).await?;

    Ok(())
}

/// Parse `KEY=CHANNEL[,CHANNEL...]`.
fn parse_grant(grant: &str) -> Result<(String, Vec<String>)> {
    let (key, channels) = grant
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid --api-key '{}', expected KEY=CHANNEL[,CHANNEL...]", grant))?;
    let channels: Vec<String> = channels
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if key.trim().is_empty() || channels.is_empty() {
        return Err(anyhow!("invalid --api-key '{}', expected KEY=CHANNEL[,CHANNEL...]", grant));
    }
    Ok((key.trim().to_string(), channels))
}
