use crate::pagination::{
    filter::{FilterMap, non_empty},
    sort::SortOrder,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Values a pager starts from when nothing is persisted for its id.
#[derive(Debug, Clone, PartialEq)]
pub struct PagerDefaults {
    pub page: u32,
    pub page_size: u32,
    pub sort_key: String,
    pub sort_order: SortOrder,
    pub filters: FilterMap,
}

impl Default for PagerDefaults {
    fn default() -> Self {
        PagerDefaults {
            page: 1,
            page_size: 25,
            sort_key: "name".to_string(),
            sort_order: SortOrder::Asc,
            filters: FilterMap::new(),
        }
    }
}

/// Full in-memory paging state of one pager.
#[derive(Debug, Clone, PartialEq)]
pub struct PagerState {
    pub id: String,
    pub collection_type: String,
    pub page: u32,
    pub page_size: u32,
    pub sort_key: String,
    pub sort_order: SortOrder,
    pub filters: FilterMap,
    pub forced_filters: FilterMap,
    pub exact_filter_keys: Option<BTreeSet<String>>,

    // Volatile, never persisted.
    pub raw_result_count: Option<u64>,
    pub page_count: u32,
}

impl PagerState {
    pub fn from_defaults(
        id: impl Into<String>,
        collection_type: impl Into<String>,
        defaults: &PagerDefaults,
    ) -> Self {
        PagerState {
            id: id.into(),
            collection_type: collection_type.into(),
            page: defaults.page.max(1),
            page_size: defaults.page_size.max(1),
            sort_key: defaults.sort_key.clone(),
            sort_order: defaults.sort_order,
            filters: defaults.filters.clone(),
            forced_filters: FilterMap::new(),
            exact_filter_keys: None,
            raw_result_count: None,
            page_count: 1,
        }
    }

    /// Filters that constrain the query (no nulls, no blank text).
    pub fn non_empty_filters(&self) -> FilterMap {
        non_empty(&self.filters)
    }

    /// True when at least one filter is active and every active key is
    /// declared as exact-match.
    pub fn exact_match(&self) -> bool {
        let Some(exact_keys) = self.exact_filter_keys.as_ref() else {
            return false;
        };
        let active = self.non_empty_filters();
        !active.is_empty() && active.keys().all(|k| exact_keys.contains(k))
    }

    /// Records a result count, recomputes the page count and pulls `page`
    /// back into range. Returns the previous page when it had to move.
    pub fn apply_result_count(&mut self, raw_result_count: u64) -> Option<u32> {
        self.raw_result_count = Some(raw_result_count);
        self.page_count = page_count_for(raw_result_count, self.page_size);

        let clamped = self.page.clamp(1, self.page_count);
        if clamped != self.page {
            let previous = self.page;
            self.page = clamped;
            Some(previous)
        } else {
            None
        }
    }

    /// Snapshot written to durable storage. Forced filters are left out.
    pub fn to_persisted(&self) -> PersistedPagerState {
        let filters = self
            .filters
            .iter()
            .filter(|(k, _)| !self.forced_filters.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        PersistedPagerState {
            id: self.id.clone(),
            collection_type: self.collection_type.clone(),
            page: self.page,
            page_size: self.page_size,
            sort: self.sort_key.clone(),
            order: self.sort_order,
            filters,
        }
    }

    /// Overwrites the scalar fields from a persisted record and merges its
    /// filters into the in-memory ones.
    pub fn merge_persisted(&mut self, record: PersistedPagerState) {
        self.page = record.page.max(1);
        self.page_size = record.page_size.max(1);
        self.sort_key = record.sort;
        self.sort_order = record.order;
        self.filters.extend(record.filters);
    }
}

/// Durable record, one per pager id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPagerState {
    pub id: String,
    #[serde(rename = "type")]
    pub collection_type: String,
    pub page: u32,
    pub page_size: u32,
    pub sort: String,
    pub order: SortOrder,
    #[serde(default)]
    pub filters: FilterMap,
}

/// `max(1, ceil(raw_result_count / page_size))`.
pub fn page_count_for(raw_result_count: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = raw_result_count.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::filter::FilterValue;

    fn state() -> PagerState {
        PagerState::from_defaults("users", "User", &PagerDefaults::default())
    }

    #[test]
    fn page_count_is_floored_at_one() {
        assert_eq!(page_count_for(0, 25), 1);
        assert_eq!(page_count_for(25, 25), 1);
        assert_eq!(page_count_for(26, 25), 2);
        assert_eq!(page_count_for(101, 10), 11);
    }

    #[test]
    fn clamps_page_into_range_for_any_count() {
        for raw in [0u64, 1, 9, 10, 11, 99, 100, 1000] {
            for size in [1u32, 5, 10, 25] {
                for page in [1u32, 2, 7, 50, 5000] {
                    let mut s = state();
                    s.page_size = size;
                    s.page = page;
                    s.apply_result_count(raw);
                    assert!(s.page >= 1);
                    assert!(s.page <= page_count_for(raw, size));
                }
            }
        }
    }

    #[test]
    fn reports_previous_page_only_when_moved() {
        let mut s = state();
        s.page = 4;
        s.page_size = 10;
        assert_eq!(s.apply_result_count(100), None);
        assert_eq!(s.apply_result_count(15), Some(4));
        assert_eq!(s.page, 2);
        assert_eq!(s.page_count, 2);
    }

    #[test]
    fn persisted_record_excludes_forced_filters() {
        let mut s = state();
        s.forced_filters
            .insert("status".into(), FilterValue::from("active"));
        s.filters.insert("status".into(), FilterValue::from("active"));
        s.filters.insert("name".into(), FilterValue::from("foo"));

        let record = s.to_persisted();
        assert!(!record.filters.contains_key("status"));
        assert_eq!(record.filters["name"], FilterValue::from("foo"));
    }

    #[test]
    fn record_uses_wire_field_names() {
        let mut s = state();
        s.sort_order = SortOrder::Desc;
        let json = serde_json::to_value(s.to_persisted()).unwrap();
        assert_eq!(json["type"], "User");
        assert_eq!(json["pageSize"], 25);
        assert_eq!(json["sort"], "name");
        assert_eq!(json["order"], "desc");
    }

    #[test]
    fn exact_match_requires_every_active_key() {
        let mut s = state();
        s.exact_filter_keys = Some(BTreeSet::from(["name".to_string()]));
        assert!(!s.exact_match());

        s.filters.insert("name".into(), FilterValue::from("admin"));
        assert!(s.exact_match());

        s.filters.insert("email".into(), FilterValue::from("a@b"));
        assert!(!s.exact_match());

        s.filters.insert("email".into(), FilterValue::from(""));
        assert!(s.exact_match());
    }
}
