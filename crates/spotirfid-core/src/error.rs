use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Identifier errors
    #[error("Invalid tag UID: {0}")]
    InvalidTagUid(String),

    #[error("Invalid resource identifier: {0}")]
    InvalidResourceId(String),

    #[error("Invalid target identifier: {0}")]
    InvalidTargetId(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
