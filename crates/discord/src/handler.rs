//! Discord event handler for serenity.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    async_trait::async_trait,
    serenity::all::{Channel, Context, EventHandler, GatewayIntents, Message, Ready},
    tracing::{debug, info, warn},
};

use youtuply_bot::{ChatOutbound, InboundMessage, InstanceRegistry, LoadErrorHook};

use crate::outbound::DiscordOutbound;

/// Handler for Discord gateway events.
pub struct YoutuplyHandler {
    registry: Arc<InstanceRegistry>,
    outbound: Arc<DiscordOutbound>,
    loaded: AtomicBool,
}

impl YoutuplyHandler {
    pub fn new(registry: Arc<InstanceRegistry>, outbound: Arc<DiscordOutbound>) -> Self {
        Self {
            registry,
            outbound,
            loaded: AtomicBool::new(false),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }
}

/// Tells owners of unreadable settings files to set up again, over DM.
struct DmLoadErrorHook {
    outbound: Arc<DiscordOutbound>,
}

#[async_trait]
impl LoadErrorHook for DmLoadErrorHook {
    async fn on_load_error(&self, user_id: &str, server_id: &str, error: &youtuply_bot::Error) {
        if user_id.is_empty() {
            warn!(server_id, error = %error, "settings file with no recoverable owner skipped");
            return;
        }
        let text = format!(
            "I couldn't restore your saved settings ({error}). Please run `!ytp setup` to start over."
        );
        if let Err(e) = self.outbound.send_direct_message(user_id, &text).await {
            warn!(user_id, error = %e, "could not notify user about broken settings");
        }
    }
}

#[async_trait]
impl EventHandler for YoutuplyHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );
        self.outbound.set_http(ctx.http.clone());

        // Reconnects fire `ready` again; instances are only loaded once.
        if !self.loaded.swap(true, Ordering::SeqCst) {
            let hook = DmLoadErrorHook {
                outbound: Arc::clone(&self.outbound),
            };
            match self.registry.load_all(&hook).await {
                Ok(count) => info!(count, "instances restored from disk"),
                Err(e) => warn!(error = %e, "instance restore failed"),
            }
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Skip bot messages to prevent loops.
        if msg.author.bot {
            return;
        }

        let is_direct = msg.guild_id.is_none();
        let recipient_id = if is_direct {
            match msg.channel(&ctx).await {
                Ok(Channel::Private(private)) => Some(private.recipient.id.to_string()),
                Ok(_) => None,
                Err(e) => {
                    debug!(channel_id = %msg.channel_id, error = %e, "DM channel lookup failed");
                    None
                },
            }
        } else {
            None
        };
        let guild_name = msg
            .guild_id
            .and_then(|gid| ctx.cache.guild(gid).map(|g| g.name.clone()));

        let inbound = InboundMessage {
            content: msg.content.clone(),
            author_id: msg.author.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            guild_id: msg.guild_id.map(|g| g.to_string()),
            guild_name,
            recipient_id,
            is_direct,
        };
        debug!(
            author_id = %inbound.author_id,
            channel_id = %inbound.channel_id,
            is_direct,
            "discord inbound message"
        );
        self.registry.route(inbound).await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_cover_guilds_dms_and_content() {
        let intents = YoutuplyHandler::intents();
        assert!(intents.contains(GatewayIntents::GUILDS));
        assert!(intents.contains(GatewayIntents::GUILD_MESSAGES));
        assert!(intents.contains(GatewayIntents::DIRECT_MESSAGES));
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
    }
}
