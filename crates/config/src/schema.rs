use std::path::PathBuf;

use {secrecy::Secret, serde::Deserialize};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct YoutuplyConfig {
    /// Overrides the default data directory (instance settings + tokens).
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub youtube: YouTubeConfig,
}

/// Discord gateway settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Bot token. Usually supplied via `YOUTUPLY_DISCORD_TOKEN` instead.
    #[serde(default)]
    pub token: Option<Secret<String>>,
}

/// YouTube Data API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YouTubeConfig {
    /// Base URL of the Data API (override for tests).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub oauth: OAuthClientConfig,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            oauth: OAuthClientConfig::default(),
        }
    }
}

/// OAuth application credentials and endpoints for the device flow.
///
/// Create the client id/secret as a "TV and Limited Input" OAuth client in
/// the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuthClientConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "empty_secret")]
    pub client_secret: Secret<String>,
    #[serde(default = "default_device_code_url")]
    pub device_code_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl Default for OAuthClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: empty_secret(),
            device_code_url: default_device_code_url(),
            token_url: default_token_url(),
            scope: default_scope(),
        }
    }
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

fn default_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}

fn default_device_code_url() -> String {
    "https://oauth2.googleapis.com/device/code".into()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".into()
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/youtube".into()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_google() {
        let cfg = YoutuplyConfig::default();
        assert_eq!(cfg.youtube.api_base, "https://www.googleapis.com/youtube/v3");
        assert_eq!(
            cfg.youtube.oauth.device_code_url,
            "https://oauth2.googleapis.com/device/code"
        );
        assert_eq!(
            cfg.youtube.oauth.token_url,
            "https://oauth2.googleapis.com/token"
        );
        assert_eq!(
            cfg.youtube.oauth.scope,
            "https://www.googleapis.com/auth/youtube"
        );
        assert!(cfg.discord.token.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: YoutuplyConfig = toml::from_str(
            r#"
            [youtube.oauth]
            client_id = "abc.apps.googleusercontent.com"
            client_secret = "shhh"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.youtube.oauth.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(
            cfg.youtube.oauth.token_url,
            "https://oauth2.googleapis.com/token"
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = toml::from_str::<YoutuplyConfig>("surprise = true");
        assert!(parsed.is_err());
    }
}
