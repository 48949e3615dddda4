use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No stored credentials for this user (or they became unusable).
    #[error("I'm not authorized for user {user_id}. Please use `!ytp setup` to authorize me.")]
    NotAuthorized { user_id: String },

    /// The auth service rejected a refresh-token exchange. A full device
    /// flow re-authorization is required.
    #[error("Failed to refresh access token. Please use `!ytp setup` to authorize me again.")]
    RefreshFailed,

    /// Unexpected response from the auth service outside the poll loop.
    #[error("auth service error: {0}")]
    AuthService(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("token record parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
