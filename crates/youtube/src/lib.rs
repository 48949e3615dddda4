//! Authorized YouTube Data API calls.
//!
//! One remote mutation: inserting a video into a user-owned playlist. Auth
//! failures trigger a single refresh-and-retry through the oauth crate.

pub mod client;
pub mod error;

pub use {
    client::PlaylistClient,
    error::{Error, Result},
};
