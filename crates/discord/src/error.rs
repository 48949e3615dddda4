use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Gateway(#[from] serenity::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
