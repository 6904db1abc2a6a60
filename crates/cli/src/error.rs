use connectors::error::TransportError;
use pager_core::error::{PagerError, StateStoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to open the data source: {0}")]
    Transport(#[from] TransportError),

    #[error("Pager error: {0}")]
    Pager(#[from] PagerError),

    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
