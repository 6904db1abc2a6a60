use thiserror::Error;

/// Errors surfaced by a transport while fetching one page.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP client failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The message channel to the serving side is gone.
    #[error("Message channel closed")]
    ChannelClosed,

    /// The serving side answered with an error message.
    #[error("Query rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown collection type for a local data source.
    #[error("Unknown collection type: {0}")]
    UnknownCollection(String),
}
