use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging already initialized or misconfigured: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
