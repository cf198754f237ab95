//! API key administration.

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use super::StoreArgs;

#[derive(Subcommand)]
pub enum ApiKeyCommands {
    /// Allow a key to act for one or more channels
    Grant {
        /// The API key
        key: String,

        /// Channels the key may act for
        #[arg(required = true)]
        channels: Vec<String>,
    },

    /// List the channels a key may act for
    Show {
        /// The API key
        key: String,
    },

    /// Remove a key
    Revoke {
        /// The API key
        key: String,
    },
}

pub async fn execute(cmd: ApiKeyCommands, store_args: &StoreArgs) -> Result<()> {
    if store_args.memory {
        bail!("API keys are only persisted in Redis; pass --api-key to `serve --memory` instead");
    }
    let store = store_args.open().await?;

    match cmd {
        ApiKeyCommands::Grant { key, channels } => {
            store.grant_key(&key, &channels).await?;
            println!("{} Key granted for: {}", "✓".green(), channels.join(", "));
        }
        ApiKeyCommands::Show { key } => match store.channels_for_key(&key).await? {
            Some(channels) => {
                println!("{}", "Channels:".bold());
                for channel in channels {
                    println!("  {} {}", "•".cyan(), channel);
                }
            }
            None => println!("{}", "Unknown key".yellow()),
        },
        ApiKeyCommands::Revoke { key } => {
            if store.revoke_key(&key).await? {
                println!("{} Key revoked", "✓".green());
            } else {
                println!("{}", "Unknown key".yellow());
            }
        }
    }

    Ok(())
}
