use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Web session not initialized")]
    WebSessionMissing,

    #[error("Invalid product key: {0}")]
    InvalidKey(String),

    #[error("Unknown bot: {0}")]
    UnknownBot(String),
}

pub type Result<T> = std::result::Result<T, Error>;
