use std::collections::HashMap;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// Per-user instance state: who owns the instance, where it was set up, and
/// which channels feed which playlists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSettings {
    pub user_id: String,
    /// Empty for instances set up over DM.
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub server_name: String,
    /// channel id -> playlist id
    #[serde(default)]
    pub connections: HashMap<String, String>,
}

impl BotSettings {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            server_id: String::new(),
            server_name: String::new(),
            connections: HashMap::new(),
        }
    }
}

/// Receives the full settings snapshot after every mutation.
#[async_trait]
pub trait SettingsSink: Send + Sync {
    async fn settings_changed(&self, settings: &BotSettings) -> Result<()>;
}
