use std::{
    path::{Path, PathBuf},
    sync::RwLock,
};

use {secrecy::Secret, tracing::{debug, warn}};

use crate::schema::YoutuplyConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["youtuply.toml", "youtuply.json"];

static DATA_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<YoutuplyConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./youtuply.{toml,json}` (project-local)
/// 2. `~/.config/youtuply/youtuply.{toml,json}` (user-global)
///
/// Returns `YoutuplyConfig::default()` if no config file is found.
pub fn discover_and_load() -> YoutuplyConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    YoutuplyConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/youtuply/
    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/youtuply/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "youtuply").map(|d| d.config_dir().to_path_buf())
}

/// Override the data directory for this process (tests, `--data-dir`).
pub fn set_data_dir(path: PathBuf) {
    *DATA_DIR_OVERRIDE.write().unwrap_or_else(|e| e.into_inner()) = Some(path);
}

/// Clear a previous [`set_data_dir`] override.
pub fn clear_data_dir() {
    *DATA_DIR_OVERRIDE.write().unwrap_or_else(|e| e.into_inner()) = None;
}

/// Resolve the data directory (instance settings + token records).
///
/// Priority: programmatic override, `YOUTUPLY_DATA_DIR`, `data_dir` from the
/// config file, platform data dir.
pub fn data_dir(config: &YoutuplyConfig) -> PathBuf {
    if let Some(dir) = DATA_DIR_OVERRIDE
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return dir;
    }
    if let Ok(dir) = std::env::var("YOUTUPLY_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(dir) = &config.data_dir {
        return dir.clone();
    }
    directories::ProjectDirs::from("", "", "youtuply")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".youtuply"))
}

/// Override individual fields from `YOUTUPLY_*` env vars.
pub fn apply_env_overrides(config: &mut YoutuplyConfig) {
    if let Ok(v) = std::env::var("YOUTUPLY_DISCORD_TOKEN") {
        config.discord.token = Some(Secret::new(v));
    }
    if let Ok(v) = std::env::var("YOUTUPLY_OAUTH_CLIENT_ID") {
        config.youtube.oauth.client_id = v;
    }
    if let Ok(v) = std::env::var("YOUTUPLY_OAUTH_CLIENT_SECRET") {
        config.youtube.oauth.client_secret = Secret::new(v);
    }
    if let Ok(v) = std::env::var("YOUTUPLY_OAUTH_DEVICE_CODE_URL") {
        config.youtube.oauth.device_code_url = v;
    }
    if let Ok(v) = std::env::var("YOUTUPLY_OAUTH_TOKEN_URL") {
        config.youtube.oauth.token_url = v;
    }
    if let Ok(v) = std::env::var("YOUTUPLY_YOUTUBE_API_BASE") {
        config.youtube.api_base = v;
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<YoutuplyConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
