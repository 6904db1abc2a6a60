use crate::error::TransportError;
use async_trait::async_trait;
use model::pagination::page::{FetchResult, PageQuery};

/// Performs the actual data call on behalf of a pager.
///
/// Implementations own their error reporting and timeouts; the pager calls
/// `fetch` once per state change and never retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, query: &PageQuery) -> Result<FetchResult, TransportError>;

    /// Short label used in logs.
    fn name(&self) -> &'static str;
}
