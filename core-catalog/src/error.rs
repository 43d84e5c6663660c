use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Catalog request to {uri} failed with HTTP {status}")]
    HttpStatus { uri: String, status: u16 },

    #[error("Malformed catalog descriptor: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
