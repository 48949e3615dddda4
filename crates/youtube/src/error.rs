use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Credential problems: missing authorization, rejected refresh.
    #[error(transparent)]
    Auth(#[from] youtuply_oauth::Error),

    /// Non-auth HTTP failure from the Data API.
    #[error("YouTube API request failed ({status}): {body}")]
    RequestFailed { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
