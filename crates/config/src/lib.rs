//! Configuration loading and schema.
//!
//! Config files: `youtuply.toml` or `youtuply.json`, searched in `./` then
//! `~/.config/youtuply/`. Individual fields can be overridden through
//! `YOUTUPLY_*` environment variables.

pub mod loader;
pub mod schema;

pub use {
    loader::{
        apply_env_overrides, clear_data_dir, config_dir, data_dir, discover_and_load, load_config,
        set_data_dir,
    },
    schema::{DiscordConfig, OAuthClientConfig, YouTubeConfig, YoutuplyConfig},
};
