use crate::pagination::{
    filter::FilterMap,
    sort::SortOrder,
    state::PagerState,
};
use serde::{Deserialize, Serialize};

/// One page request handed to a transport.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub collection_type: String,
    pub page_size: u32,
    pub page: u32,
    pub sort_key: String,
    pub sort_order: SortOrder,
    /// Only the non-empty filters.
    pub filters: FilterMap,
    pub exact: bool,
}

impl PageQuery {
    pub fn from_state(state: &PagerState) -> Self {
        PageQuery {
            collection_type: state.collection_type.clone(),
            page_size: state.page_size,
            page: state.page,
            sort_key: state.sort_key.clone(),
            sort_order: state.sort_order,
            filters: state.non_empty_filters(),
            exact: state.exact_match(),
        }
    }

    /// Zero-based index of the first item on the requested page.
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }
}

/// What a transport hands back for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub items: Vec<serde_json::Value>,
    /// Total number of matching items across all pages.
    pub raw_result_count: u64,
    pub took_ms: u128,
}

impl FetchResult {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
