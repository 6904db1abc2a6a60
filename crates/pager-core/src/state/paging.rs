use crate::{
    error::StateStoreError,
    state::{StateBackend, memory::MemoryBackend},
};
use model::pagination::{
    filter::FilterMap,
    state::{PagerDefaults, PagerState, PersistedPagerState},
};
use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex},
};
use tracing::{debug, warn};

pub const DEFAULT_NAMESPACE: &str = "structrPagerData";

/// Paging state for every pager id, kept in memory and written through to a
/// durable backend under `<namespace>:<id>`.
///
/// Persistence is best-effort: backend failures are logged and the in-memory
/// state stays authoritative.
pub struct PagingStateStore {
    namespace: String,
    backend: Arc<dyn StateBackend>,
    registry: Mutex<HashMap<String, PagerState>>,
}

impl PagingStateStore {
    pub fn new(namespace: impl Into<String>, backend: Arc<dyn StateBackend>) -> Self {
        PagingStateStore {
            namespace: namespace.into(),
            backend,
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(DEFAULT_NAMESPACE, Arc::new(MemoryBackend::new()))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn durable_key(&self, id: &str) -> String {
        format!("{}:{}", self.namespace, id)
    }

    /// Returns the state for `id`, creating it on first use.
    ///
    /// An id already known in memory is returned as is; otherwise the durable
    /// record is merged over `defaults`. The result is always written back.
    pub fn initialize(
        &self,
        id: &str,
        collection_type: &str,
        defaults: &PagerDefaults,
    ) -> PagerState {
        let state = match self.state(id) {
            Some(existing) => {
                debug!(pager_id = %id, "Pager state already initialized");
                existing
            }
            None => {
                let mut state = PagerState::from_defaults(id, collection_type, defaults);
                if self.restore(&mut state) {
                    debug!(pager_id = %id, page = state.page, "Restored persisted pager state");
                }
                state
            }
        };

        self.persist(&state);
        state
    }

    /// Replaces the active filters and exact-match keys. Forced filters stay
    /// on top.
    pub fn initialize_filters(
        &self,
        state: &mut PagerState,
        filters: FilterMap,
        exact_filter_keys: Option<BTreeSet<String>>,
    ) {
        state.filters = filters;
        state.filters.extend(state.forced_filters.clone());
        state.exact_filter_keys = exact_filter_keys;
        self.persist(state);
    }

    /// Pins `filters` so reconciliation never removes them.
    pub fn force_add_filters(&self, state: &mut PagerState, filters: FilterMap) {
        state.forced_filters.extend(filters.clone());
        state.filters.extend(filters);
        self.persist(state);
    }

    pub fn persist(&self, state: &PagerState) {
        match self.registry.lock() {
            Ok(mut registry) => {
                registry.insert(state.id.clone(), state.clone());
            }
            Err(_) => warn!(pager_id = %state.id, "Pager registry lock poisoned"),
        }

        let key = self.durable_key(&state.id);
        let written = serde_json::to_string(&state.to_persisted())
            .map_err(StateStoreError::from)
            .and_then(|json| self.backend.put(&key, &json));

        if let Err(e) = written {
            warn!(pager_id = %state.id, key = %key, error = %e, "Failed to persist pager state");
        }
    }

    /// Applies the durable record for `state.id`, if there is a usable one.
    pub fn restore(&self, state: &mut PagerState) -> bool {
        match self.load(&state.id) {
            Ok(Some(record)) => {
                state.merge_persisted(record);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(pager_id = %state.id, error = %e, "Failed to read persisted pager state");
                false
            }
        }
    }

    /// Reads the durable record for `id`. A record that does not parse is
    /// deleted and reported as absent.
    pub fn load(&self, id: &str) -> Result<Option<PersistedPagerState>, StateStoreError> {
        let key = self.durable_key(id);
        let Some(raw) = self.backend.get(&key)? else {
            return Ok(None);
        };

        match serde_json::from_str::<PersistedPagerState>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(pager_id = %id, key = %key, error = %e, "Discarding unreadable pager state");
                if let Err(e) = self.backend.remove(&key) {
                    warn!(key = %key, error = %e, "Failed to remove unreadable pager state");
                }
                Ok(None)
            }
        }
    }

    /// Drops the in-memory and durable state for `id`.
    pub fn forget(&self, id: &str) -> Result<(), StateStoreError> {
        if let Ok(mut registry) = self.registry.lock() {
            registry.remove(id);
        }
        self.backend.remove(&self.durable_key(id))
    }

    /// Ids with a durable record in this namespace, in key order.
    pub fn ids(&self) -> Result<Vec<String>, StateStoreError> {
        let prefix = format!("{}:", self.namespace());
        Ok(self
            .backend
            .keys_with_prefix(&prefix)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(String::from))
            .collect())
    }

    /// In-memory state for `id`, if a pager has initialized it.
    pub fn state(&self, id: &str) -> Option<PagerState> {
        self.registry
            .lock()
            .ok()
            .and_then(|registry| registry.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::pagination::{filter::FilterValue, sort::SortOrder};

    struct FailingBackend;

    impl StateBackend for FailingBackend {
        fn get(&self, _key: &str) -> Result<Option<String>, StateStoreError> {
            Err(StateStoreError::Poisoned)
        }
        fn put(&self, _key: &str, _value: &str) -> Result<(), StateStoreError> {
            Err(StateStoreError::Poisoned)
        }
        fn remove(&self, _key: &str) -> Result<(), StateStoreError> {
            Err(StateStoreError::Poisoned)
        }
        fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>, StateStoreError> {
            Err(StateStoreError::Poisoned)
        }
    }

    fn store_with(backend: Arc<MemoryBackend>) -> PagingStateStore {
        PagingStateStore::new("test", backend)
    }

    #[test]
    fn seeds_defaults_and_writes_them_back() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());

        let state = store.initialize("users", "User", &PagerDefaults::default());
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size, 25);
        assert_eq!(state.sort_key, "name");

        let raw = backend.get("test:users").unwrap().unwrap();
        let record: PersistedPagerState = serde_json::from_str(&raw).unwrap();
        assert_eq!(record, state.to_persisted());
    }

    #[test]
    fn initialize_does_not_clobber_known_state() {
        let store = PagingStateStore::in_memory();
        let mut state = store.initialize("users", "User", &PagerDefaults::default());
        state.page = 4;
        state.sort_order = SortOrder::Desc;
        store.persist(&state);

        let defaults = PagerDefaults {
            page: 1,
            page_size: 10,
            ..PagerDefaults::default()
        };
        let again = store.initialize("users", "User", &defaults);
        assert_eq!(again.page, 4);
        assert_eq!(again.page_size, 25);
        assert_eq!(again.sort_order, SortOrder::Desc);
    }

    #[test]
    fn restore_merges_filters_key_by_key() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .put(
                "test:users",
                r#"{"id":"users","type":"User","page":2,"pageSize":50,"sort":"email","order":"desc","filters":{"name":"foo"}}"#,
            )
            .unwrap();
        let store = store_with(backend);

        let mut state = PagerState::from_defaults("users", "User", &PagerDefaults::default());
        state.filters.insert("name".into(), FilterValue::from("bar"));
        state.filters.insert("isAdmin".into(), FilterValue::Bool(true));

        assert!(store.restore(&mut state));
        assert_eq!(state.page, 2);
        assert_eq!(state.page_size, 50);
        assert_eq!(state.sort_key, "email");
        assert_eq!(state.sort_order, SortOrder::Desc);
        assert_eq!(state.filters["name"], FilterValue::from("foo"));
        assert_eq!(state.filters["isAdmin"], FilterValue::Bool(true));
    }

    #[test]
    fn restore_without_record_leaves_state_alone() {
        let store = PagingStateStore::in_memory();
        let mut state = PagerState::from_defaults("users", "User", &PagerDefaults::default());
        let before = state.clone();
        assert!(!store.restore(&mut state));
        assert_eq!(state, before);
    }

    #[test]
    fn corrupt_record_is_deleted() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("test:users", "{not json").unwrap();
        let store = store_with(backend.clone());

        assert!(store.load("users").unwrap().is_none());
        assert!(backend.get("test:users").unwrap().is_none());
    }

    #[test]
    fn record_with_wrong_shape_is_deleted() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .put("test:users", r#"{"id":"users","page":"three"}"#)
            .unwrap();
        let store = store_with(backend.clone());

        let state = store.initialize("users", "User", &PagerDefaults::default());
        assert_eq!(state.page, 1);
        let rewritten: PersistedPagerState =
            serde_json::from_str(&backend.get("test:users").unwrap().unwrap()).unwrap();
        assert_eq!(rewritten.page, 1);
    }

    #[test]
    fn forced_filters_are_active_but_not_persisted() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        let mut state = store.initialize("users", "User", &PagerDefaults::default());

        store.force_add_filters(
            &mut state,
            FilterMap::from([("status".to_string(), FilterValue::from("active"))]),
        );
        assert_eq!(state.filters["status"], FilterValue::from("active"));
        assert_eq!(state.forced_filters.len(), 1);

        let record = store.load("users").unwrap().unwrap();
        assert!(!record.filters.contains_key("status"));
    }

    #[test]
    fn initialize_filters_keeps_forced_on_top() {
        let store = PagingStateStore::in_memory();
        let mut state = store.initialize("users", "User", &PagerDefaults::default());
        store.force_add_filters(
            &mut state,
            FilterMap::from([("status".to_string(), FilterValue::from("active"))]),
        );

        store.initialize_filters(
            &mut state,
            FilterMap::from([("name".to_string(), FilterValue::from("x"))]),
            Some(BTreeSet::from(["name".to_string()])),
        );
        assert_eq!(state.filters.len(), 2);
        assert!(state.exact_filter_keys.unwrap().contains("name"));
    }

    #[test]
    fn ids_stay_inside_the_namespace() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("other:groups", "{}").unwrap();
        let store = store_with(backend);
        store.initialize("users", "User", &PagerDefaults::default());
        store.initialize("files", "File", &PagerDefaults::default());

        assert_eq!(store.namespace(), "test");
        assert_eq!(store.ids().unwrap(), vec!["files", "users"]);
    }

    #[test]
    fn forget_removes_both_copies() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        store.initialize("users", "User", &PagerDefaults::default());

        store.forget("users").unwrap();
        assert!(store.state("users").is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn backend_failures_do_not_break_memory_state() {
        let store = PagingStateStore::new("test", Arc::new(FailingBackend));
        let mut state = store.initialize("users", "User", &PagerDefaults::default());
        state.page = 7;
        store.persist(&state);
        assert_eq!(store.state("users").unwrap().page, 7);
        assert!(store.load("users").is_err());
    }
}
