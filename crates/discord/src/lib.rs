//! Discord connector.
//!
//! Bridges the serenity gateway to the platform-independent bot core:
//! inbound messages are normalized and routed through the registry, and
//! the registry's replies go back out through [`DiscordOutbound`].

pub mod error;
pub mod handler;
pub mod outbound;

use std::sync::Arc;

use serenity::Client;

use youtuply_bot::InstanceRegistry;

pub use {
    error::{Error, Result},
    handler::YoutuplyHandler,
    outbound::DiscordOutbound,
};

/// Connect to the gateway and run until the connection dies.
pub async fn run(
    token: &str,
    registry: Arc<InstanceRegistry>,
    outbound: Arc<DiscordOutbound>,
) -> Result<()> {
    let handler = YoutuplyHandler::new(registry, outbound);
    let mut client = Client::builder(token, YoutuplyHandler::intents())
        .event_handler(handler)
        .await?;
    client.start().await?;
    Ok(())
}
