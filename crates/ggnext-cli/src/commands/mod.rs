//! CLI command definitions and handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use ggnext_redis::{ConnectOptions, MemoryQueueStore, QueueStore, RedisQueueStore};

pub mod api_key;
pub mod serve;

/// ggNext - challenger queues for streaming channels
#[derive(Parser)]
#[command(name = "ggnext")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve(serve::ServeArgs),

    /// Manage chat-bot API keys
    #[command(subcommand)]
    ApiKey(api_key::ApiKeyCommands),
}

/// Where queues and API keys live.
#[derive(Args)]
pub struct StoreArgs {
    /// Redis connection URL
    #[arg(
        long,
        global = true,
        env = "GGNEXT_REDIS_URL",
        default_value = "redis://127.0.0.1:6379"
    )]
    pub redis_url: String,

    /// Keep everything in memory instead of Redis (lost on exit)
    #[arg(long, global = true)]
    pub memory: bool,

    /// Connection attempts before giving up at startup
    #[arg(long, global = true, default_value = "10")]
    pub connect_attempts: u32,

    /// Seconds between connection attempts
    #[arg(long, global = true, default_value = "3")]
    pub connect_interval_secs: u64,
}

impl StoreArgs {
    pub async fn open(&self) -> Result<Arc<dyn QueueStore>> {
        if self.memory {
            info!("Using in-memory queue store, queues are lost on exit");
            return Ok(Arc::new(MemoryQueueStore::new()));
        }
        if self.connect_attempts == 0 {
            bail!("--connect-attempts must be at least 1");
        }
        let options = ConnectOptions {
            max_attempts: self.connect_attempts,
            retry_interval: Duration::from_secs(self.connect_interval_secs),
        };
        let store = RedisQueueStore::connect(&self.redis_url, options).await?;
        info!("Using Redis queue store");
        Ok(Arc::new(store))
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::execute(args, &self.store).await,
            Commands::ApiKey(cmd) => api_key::execute(cmd, &self.store).await,
        }
    }
}
