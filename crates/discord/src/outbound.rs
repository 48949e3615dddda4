use std::sync::{Arc, RwLock};

use {
    async_trait::async_trait,
    serenity::all::{ChannelId, UserId},
    tracing::debug,
};

use youtuply_bot::{ChatOutbound, InboundMessage};

/// Sends through the gateway's HTTP handle once the bot is connected.
///
/// The handle arrives with the `ready` event, after the registry and
/// instances already exist, hence the late binding.
#[derive(Default)]
pub struct DiscordOutbound {
    http: RwLock<Option<Arc<serenity::http::Http>>>,
}

impl DiscordOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_http(&self, http: Arc<serenity::http::Http>) {
        *self.http.write().unwrap_or_else(|e| e.into_inner()) = Some(http);
        debug!("discord http handle bound");
    }

    fn resolve_http(&self) -> youtuply_bot::Result<Arc<serenity::http::Http>> {
        self.http
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| youtuply_bot::Error::Send("discord gateway not connected yet".into()))
    }
}

fn parse_channel_id(raw: &str) -> youtuply_bot::Result<ChannelId> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChannelId::new)
        .ok_or_else(|| youtuply_bot::Error::Send(format!("invalid Discord channel id: {raw}")))
}

fn parse_user_id(raw: &str) -> youtuply_bot::Result<UserId> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId::new)
        .ok_or_else(|| youtuply_bot::Error::Send(format!("invalid Discord user id: {raw}")))
}

#[async_trait]
impl ChatOutbound for DiscordOutbound {
    async fn reply(&self, message: &InboundMessage, text: &str) -> youtuply_bot::Result<()> {
        let http = self.resolve_http()?;
        let channel_id = parse_channel_id(&message.channel_id)?;
        channel_id
            .say(&http, text)
            .await
            .map_err(|e| youtuply_bot::Error::Send(format!("discord reply: {e}")))?;
        Ok(())
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> youtuply_bot::Result<()> {
        let http = self.resolve_http()?;
        let user = parse_user_id(user_id)?;
        let dm = user
            .create_dm_channel(&http)
            .await
            .map_err(|e| youtuply_bot::Error::Send(format!("discord open DM: {e}")))?;
        dm.id
            .say(&http, text)
            .await
            .map_err(|e| youtuply_bot::Error::Send(format!("discord DM: {e}")))?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_must_be_a_nonzero_snowflake() {
        assert!(parse_channel_id("123456789").is_ok());
        assert!(parse_channel_id("0").is_err());
        assert!(parse_channel_id("general").is_err());
        assert!(parse_channel_id("").is_err());
    }

    #[test]
    fn user_id_parses_the_same_way() {
        assert!(parse_user_id("987654321").is_ok());
        assert!(parse_user_id("-1").is_err());
    }

    #[tokio::test]
    async fn sends_before_ready_fail_cleanly() {
        let outbound = DiscordOutbound::new();
        let err = outbound.send_direct_message("123", "hi").await.unwrap_err();
        assert!(matches!(err, youtuply_bot::Error::Send(_)));
    }
}
