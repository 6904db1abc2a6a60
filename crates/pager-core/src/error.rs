use connectors::error::TransportError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Failed to open state store: {0}")]
    Open(String),

    #[error("State backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("State backend lock poisoned")]
    Poisoned,

    #[error("Failed to serialize pager state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PagerError {
    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidInput {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Fetch did not settle within {0:?}")]
    Timeout(Duration),
}

impl PagerError {
    pub(crate) fn invalid(field: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        PagerError::InvalidInput {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
