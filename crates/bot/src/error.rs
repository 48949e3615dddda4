use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Command parsed but its parameters are unusable; the message is sent
    /// back to the user verbatim.
    #[error("{0}")]
    MalformedCommand(String),

    #[error(transparent)]
    Auth(#[from] youtuply_oauth::Error),

    #[error(transparent)]
    Playlist(#[from] youtuply_youtube::Error),

    /// Outbound chat delivery failed.
    #[error("failed to send chat message: {0}")]
    Send(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("settings record parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
