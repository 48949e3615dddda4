use async_trait::async_trait;

use crate::Result;

/// An inbound chat message, already stripped of platform-specific detail.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub content: String,
    pub author_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub guild_name: Option<String>,
    /// The other party of a direct-message channel. `None` for guild
    /// channels.
    pub recipient_id: Option<String>,
    pub is_direct: bool,
}

/// Outbound side of the chat platform.
///
/// The connector crate implements this against the real gateway; tests use
/// a recording stub.
#[async_trait]
pub trait ChatOutbound: Send + Sync {
    /// Reply in the channel `message` arrived in.
    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<()>;

    /// Open (or reuse) a direct-message channel to `user_id` and send
    /// `text` there.
    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<()>;
}
