use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaviconError {
    #[error("Failed to decode icon: {0}")]
    Decode(String),

    #[error("Failed to persist lookup cache: {0}")]
    Persistence(String),

    #[error("Lookup cache serialization failed: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, FaviconError>;
