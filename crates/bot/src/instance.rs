use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use {
    youtuply_oauth::{DeviceAuthFlow, DeviceFlowOutcome},
    youtuply_parsing::{VideoRef, extract_links, video_id_from_url},
    youtuply_youtube::PlaylistClient,
};

use crate::{
    Error, Result,
    message::{ChatOutbound, InboundMessage},
    settings::{BotSettings, SettingsSink},
};

/// Every command starts with this token.
pub const COMMAND_PREFIX: &str = "!ytp";

const HELP_TEXT: &str = "\
Youtuply commands:
`!ytp setup` - authorize me to manage your YouTube playlists
`!ytp connect <playlistId>` - add videos posted in this channel to that playlist
`!ytp add <videoUrl> <playlistId>` - add a single video to a playlist
`!ytp help` - show this message";

/// One user's bot: their settings, their credentials, their connected
/// channels. Everything that arrives on a channel the registry routes here
/// is interpreted against this user's state.
pub struct BotInstance {
    settings: Mutex<BotSettings>,
    outbound: Arc<dyn ChatOutbound>,
    playlists: Arc<PlaylistClient>,
    auth: Arc<DeviceAuthFlow>,
    sink: Arc<dyn SettingsSink>,
}

impl BotInstance {
    pub fn new(
        settings: BotSettings,
        outbound: Arc<dyn ChatOutbound>,
        playlists: Arc<PlaylistClient>,
        auth: Arc<DeviceAuthFlow>,
        sink: Arc<dyn SettingsSink>,
    ) -> Self {
        Self {
            settings: Mutex::new(settings),
            outbound,
            playlists,
            auth,
            sink,
        }
    }

    pub fn user_id(&self) -> String {
        self.settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .user_id
            .clone()
    }

    /// Copy of the current settings, for persistence and inspection.
    pub fn settings_snapshot(&self) -> BotSettings {
        self.settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether `content` addresses the bot at all.
    pub fn is_command(content: &str) -> bool {
        content == COMMAND_PREFIX || content.starts_with("!ytp ")
    }

    /// Whether `content` is the setup command, which the registry handles
    /// specially (it creates the instance rather than routing to one).
    pub fn is_setup_request(content: &str) -> bool {
        let (name, _) = parse_command(content);
        Self::is_command(content) && name == "setup"
    }

    /// Entry point for every message routed to this instance.
    ///
    /// Command failures are reported to the owner over DM; a failure of
    /// that DM itself is only logged. Non-command messages go through the
    /// passive link scan.
    pub async fn handle_message(&self, message: &InboundMessage) {
        if Self::is_command(&message.content) {
            if let Err(e) = self.dispatch_command(message).await {
                let user_id = self.user_id();
                warn!(user_id, error = %e, "command failed");
                let text = format!("Error processing command: {e}");
                if let Err(send_err) = self.outbound.send_direct_message(&user_id, &text).await {
                    warn!(user_id, error = %send_err, "could not DM command error to owner");
                }
            }
        } else {
            self.scan_for_videos(message).await;
        }
    }

    async fn dispatch_command(&self, message: &InboundMessage) -> Result<()> {
        let (name, params) = parse_command(&message.content);
        debug!(user_id = %self.user_id(), command = %name, "dispatching command");
        match name {
            "setup" => self.cmd_setup(message).await,
            "add" => self.cmd_add(message, params).await,
            "connect" => self.cmd_connect(message, params).await,
            "help" => self.reply(message, HELP_TEXT).await,
            _ => {
                self.reply(message, "Error: Invalid command").await?;
                self.reply(message, HELP_TEXT).await
            },
        }
    }

    /// Run the device authorization flow for the owner.
    ///
    /// The verification prompt goes to the channel the command came from;
    /// the user then has the server-specified window to act.
    async fn cmd_setup(&self, message: &InboundMessage) -> Result<()> {
        let outbound = Arc::clone(&self.outbound);
        let prompt_target = message.clone();
        let outcome = self
            .auth
            .authorize(&self.user_id(), move |url, code| async move {
                let text = format!("Hi there! Please go to {url} and enter the code '{code}'");
                if let Err(e) = outbound.reply(&prompt_target, &text).await {
                    warn!(error = %e, "could not deliver verification prompt");
                }
            })
            .await?;

        match outcome {
            DeviceFlowOutcome::Authorized(_) => self.reply(message, "Success!").await,
            DeviceFlowOutcome::Denied => {
                self.reply(message, "Something went wrong: user denied access")
                    .await
            },
            DeviceFlowOutcome::Expired => {
                self.reply(message, "Something went wrong: timeout").await
            },
            DeviceFlowOutcome::Failed(detail) => {
                self.reply(message, &format!("Something went wrong: {detail}"))
                    .await
            },
        }
    }

    /// `!ytp add <videoUrl> <playlistId>`
    async fn cmd_add(&self, message: &InboundMessage, params: &str) -> Result<()> {
        let mut words = params.split_whitespace();
        let (Some(video_url), Some(playlist_id), None) =
            (words.next(), words.next(), words.next())
        else {
            return Err(Error::MalformedCommand(
                "usage: `!ytp add <videoUrl> <playlistId>`".into(),
            ));
        };
        let Some(video_id) = video_id_from_url(video_url) else {
            return Err(Error::MalformedCommand(format!(
                "'{video_url}' does not look like a YouTube video URL"
            )));
        };

        let video = VideoRef {
            url: video_url.to_string(),
            video_id,
        };
        match self
            .playlists
            .add_video(&self.user_id(), playlist_id, &video)
            .await
        {
            Ok(()) => {
                let text = format!(
                    "Added {video_url} to {}",
                    PlaylistClient::playlist_url(playlist_id)
                );
                self.reply(message, &text).await
            },
            Err(e) => {
                self.reply(message, &format!("Failed to add video to playlist: {e}"))
                    .await
            },
        }
    }

    /// `!ytp connect <playlistId>`: bind the current channel to a playlist.
    /// A second connect on the same channel replaces the binding.
    async fn cmd_connect(&self, message: &InboundMessage, params: &str) -> Result<()> {
        let playlist_id = params.trim();
        if playlist_id.is_empty() || playlist_id.contains(char::is_whitespace) {
            return Err(Error::MalformedCommand(
                "usage: `!ytp connect <playlistId>`".into(),
            ));
        }

        let snapshot = {
            let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
            settings
                .connections
                .insert(message.channel_id.clone(), playlist_id.to_string());
            settings.clone()
        };
        self.sink.settings_changed(&snapshot).await?;
        info!(
            user_id = %snapshot.user_id,
            channel_id = %message.channel_id,
            playlist_id,
            "channel connected to playlist"
        );

        let text = format!(
            "Videos posted in this channel will now automatically be added to {}",
            PlaylistClient::playlist_url(playlist_id)
        );
        self.reply(message, &text).await
    }

    /// Add every YouTube link in a non-command message to the playlist the
    /// channel is connected to, if any. Failures are logged and never
    /// announced in the channel; one bad link does not stop the rest.
    async fn scan_for_videos(&self, message: &InboundMessage) {
        let videos = extract_links(&message.content);
        if videos.is_empty() {
            return;
        }

        let target = self
            .settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .connections
            .get(&message.channel_id)
            .cloned();
        let Some(playlist_id) = target else {
            return;
        };

        let user_id = self.user_id();
        for video in &videos {
            match self.playlists.add_video(&user_id, &playlist_id, video).await {
                Ok(()) => {
                    info!(user_id, playlist_id, url = %video.url, "scanned video added");
                },
                Err(e) => {
                    warn!(user_id, playlist_id, url = %video.url, error = %e, "scanned video not added");
                },
            }
        }
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<()> {
        self.outbound.reply(message, text).await
    }
}

/// Split a command message into its name and the raw parameter tail.
///
/// `!ytp add a b` parses to `("add", "a b")`; a bare `!ytp` parses to an
/// empty name, which dispatch treats as unknown.
fn parse_command(content: &str) -> (&str, &str) {
    let mut parts = content.splitn(3, ' ');
    let _prefix = parts.next();
    let name = parts.next().unwrap_or("");
    let params = parts.next().unwrap_or("");
    (name, params)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_name_and_parameter_tail() {
        assert_eq!(
            parse_command("!ytp add https://youtu.be/x PL1"),
            ("add", "https://youtu.be/x PL1")
        );
        assert_eq!(parse_command("!ytp connect PL1"), ("connect", "PL1"));
        assert_eq!(parse_command("!ytp help"), ("help", ""));
        assert_eq!(parse_command("!ytp"), ("", ""));
    }

    #[test]
    fn command_detection_requires_exact_prefix_token() {
        assert!(BotInstance::is_command("!ytp"));
        assert!(BotInstance::is_command("!ytp help"));
        assert!(!BotInstance::is_command("!ytpx help"));
        assert!(!BotInstance::is_command("hello !ytp"));
    }

    #[test]
    fn setup_detection() {
        assert!(BotInstance::is_setup_request("!ytp setup"));
        assert!(!BotInstance::is_setup_request("!ytp connect PL1"));
        assert!(!BotInstance::is_setup_request("setup"));
    }
}
