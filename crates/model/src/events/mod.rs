use std::fmt::Debug;

/// A trait for events that can be published on the EventBus.
pub trait Event: Send + Sync + Debug + 'static {
    /// Returns a unique identifier for this event type.
    fn event_type(&self) -> &'static str;
}

/// Emitted after a fetch result has been applied to a pager.
#[derive(Debug, Clone)]
pub struct PageLoaded {
    pub pager_id: String,
    pub seq: u64,
    pub page: u32,
    pub page_count: u32,
    pub raw_result_count: u64,
    pub item_count: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event for PageLoaded {
    fn event_type(&self) -> &'static str {
        "pager.page_loaded"
    }
}

/// Emitted when a result count forced the current page back into range.
#[derive(Debug, Clone)]
pub struct PageClamped {
    pub pager_id: String,
    pub from: u32,
    pub to: u32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event for PageClamped {
    fn event_type(&self) -> &'static str {
        "pager.page_clamped"
    }
}

/// Emitted when filter reconciliation dropped stale attributes.
#[derive(Debug, Clone)]
pub struct FiltersPruned {
    pub pager_id: String,
    pub removed: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event for FiltersPruned {
    fn event_type(&self) -> &'static str {
        "pager.filters_pruned"
    }
}
