//! Platform-independent bot core.
//!
//! An [`InstanceRegistry`] holds one [`BotInstance`] per user who has run
//! `!ytp setup`. The registry routes inbound messages; instances interpret
//! commands and scan ordinary messages for YouTube links to feed into
//! connected playlists. The chat platform itself sits behind the
//! [`ChatOutbound`] trait.

pub mod error;
pub mod instance;
pub mod message;
pub mod registry;
pub mod settings;
pub mod store;

pub use {
    error::{Error, Result},
    instance::{BotInstance, COMMAND_PREFIX},
    message::{ChatOutbound, InboundMessage},
    registry::{InstanceRegistry, LoadErrorHook},
    settings::{BotSettings, SettingsSink},
    store::{LoadedSettings, SettingsStore},
};
