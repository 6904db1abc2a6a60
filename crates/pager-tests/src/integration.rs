#[cfg(test)]
mod tests {
    use crate::utils::{CountingTransport, USER_TYPE, sled_backend, user_transport, users};
    use connectors::file::json::source::JsonFileTransport;
    use model::pagination::{
        filter::{FilterControl, FilterMap, FilterValue},
        sort::SortOrder,
        state::PagerDefaults,
    };
    use pager_core::{
        cache::ObjectCache,
        pager::{
            FetchOutcome, Pager, PagerConfig,
            debounce::{FilterInput, FilterInputDebouncer},
        },
        state::{StateBackend, memory::MemoryBackend, paging::PagingStateStore},
    };
    use serde_json::Value;
    use std::{sync::Arc, time::Duration};
    use tracing_test::traced_test;

    // Scenario: No durable record exists for the pager id.
    // Expected Outcome: State equals the caller's defaults, and restoring a
    // second time changes nothing.
    #[traced_test]
    #[tokio::test]
    async fn restore_is_idempotent() {
        let store = PagingStateStore::in_memory();
        let defaults = PagerDefaults {
            page_size: 10,
            sort_key: "email".into(),
            ..PagerDefaults::default()
        };

        let state = store.initialize("users", USER_TYPE, &defaults);
        assert_eq!(state.page, 1);
        assert_eq!(state.page_size, 10);
        assert_eq!(state.sort_key, "email");

        let mut once = state.clone();
        store.restore(&mut once);
        let mut twice = once.clone();
        store.restore(&mut twice);
        assert_eq!(once, twice);
    }

    // Scenario: The pager sits on a late page when the collection shrinks.
    // Expected Outcome: After the result is applied the page lies in
    // [1, max(1, ceil(raw / size))] and no extra fetch was issued.
    #[traced_test]
    #[tokio::test]
    async fn result_count_clamps_page() {
        for (total, page_size) in [(0usize, 5u32), (7, 5), (100, 10), (101, 50)] {
            let transport = CountingTransport::new(user_transport(500));
            let store = Arc::new(PagingStateStore::in_memory());
            let mut pager = Pager::new(
                "users",
                USER_TYPE,
                transport.clone(),
                store.clone(),
                PagerConfig::default(),
            );
            pager.set_page_size(page_size).await.unwrap();
            pager.last_page().await.unwrap();

            let mut shrunk = Pager::new(
                "users",
                USER_TYPE,
                CountingTransport::new(user_transport(total)),
                store,
                PagerConfig::default(),
            );
            assert_eq!(shrunk.state().page, pager.state().page);
            shrunk.refresh().await.unwrap();

            let expected_pages = (total as u32).div_ceil(page_size).max(1);
            assert!(shrunk.state().page >= 1);
            assert!(shrunk.state().page <= expected_pages);
            assert_eq!(shrunk.state().page_count, expected_pages);
        }
    }

    // Scenario: Sort by the current key, then by a new key.
    // Expected Outcome: The first call flips the order and keeps the page;
    // the second sorts ascending from page 1.
    #[traced_test]
    #[tokio::test]
    async fn sort_key_toggles_and_resets() {
        let transport = CountingTransport::new(user_transport(100));
        let store = Arc::new(PagingStateStore::in_memory());
        let mut pager = Pager::new("users", USER_TYPE, transport.clone(), store, PagerConfig::default());
        pager.refresh().await.unwrap();
        pager.set_page(3).await.unwrap();

        pager.set_sort_key("name").await.unwrap();
        assert_eq!(pager.state().sort_key, "name");
        assert_eq!(pager.state().sort_order, SortOrder::Desc);
        assert_eq!(pager.state().page, 3);

        pager.set_sort_key("createdDate").await.unwrap();
        assert_eq!(pager.state().sort_key, "createdDate");
        assert_eq!(pager.state().sort_order, SortOrder::Asc);
        assert_eq!(pager.state().page, 1);
    }

    // Scenario: Persisted filters carry an attribute no control declares.
    // Expected Outcome: The stale attribute is removed and exactly one fetch
    // is issued.
    #[traced_test]
    #[tokio::test]
    async fn activation_prunes_stale_filters() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .put(
                "structrPagerData:users",
                r#"{"id":"users","type":"User","page":1,"pageSize":25,"sort":"name","order":"asc","filters":{"name":"foo","obsoleteAttr":"bar"}}"#,
            )
            .unwrap();
        let store = Arc::new(PagingStateStore::new("structrPagerData", backend));
        let transport = CountingTransport::new(user_transport(10));
        let mut pager = Pager::new("users", USER_TYPE, transport.clone(), store, PagerConfig::default());

        pager
            .activate_filter_elements(&[FilterControl::text("name")])
            .await
            .unwrap();

        assert_eq!(
            pager.state().filters,
            FilterMap::from([("name".to_string(), FilterValue::from("foo"))])
        );
        assert_eq!(transport.calls(), 1);
    }

    // Scenario: Same as above, with `status` pinned as a forced filter.
    // Expected Outcome: `status` survives reconciliation.
    #[traced_test]
    #[tokio::test]
    async fn forced_filters_survive_pruning() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .put(
                "structrPagerData:users",
                r#"{"id":"users","type":"User","page":1,"pageSize":25,"sort":"name","order":"asc","filters":{"name":"foo","obsoleteAttr":"bar","status":"active"}}"#,
            )
            .unwrap();
        let store = Arc::new(PagingStateStore::new("structrPagerData", backend));
        let transport = CountingTransport::new(user_transport(10));
        let config = PagerConfig {
            forced_filters: FilterMap::from([("status".to_string(), FilterValue::from("active"))]),
            ..PagerConfig::default()
        };
        let mut pager = Pager::new("users", USER_TYPE, transport.clone(), store, config);

        let activation = pager
            .activate_filter_elements(&[FilterControl::text("name")])
            .await
            .unwrap();

        assert_eq!(activation.pruned, vec!["obsoleteAttr".to_string()]);
        assert_eq!(pager.state().filters["status"], FilterValue::from("active"));
        assert_eq!(
            transport.last_query().unwrap().filters["status"],
            FilterValue::from("active")
        );
    }

    // Scenario: Filters hold a blank string, a value and a null.
    // Expected Outcome: Only the real value is sent.
    #[traced_test]
    #[tokio::test]
    async fn non_empty_filter_extraction() {
        let config = PagerConfig {
            defaults: PagerDefaults {
                filters: FilterMap::from([
                    ("name".to_string(), FilterValue::from("")),
                    ("locale".to_string(), FilterValue::from("en")),
                    ("flag".to_string(), FilterValue::Null),
                ]),
                ..PagerDefaults::default()
            },
            ..PagerConfig::default()
        };
        let pager = Pager::new(
            "users",
            USER_TYPE,
            CountingTransport::new(user_transport(1)),
            Arc::new(PagingStateStore::in_memory()),
            config,
        );

        assert_eq!(
            pager.get_non_empty_filter_attributes(),
            FilterMap::from([("locale".to_string(), FilterValue::from("en"))])
        );
    }

    // Scenario: Change page and page size, then build a new store and pager
    // over the same on-disk state.
    // Expected Outcome: Page 3 and page size 50 come back.
    #[traced_test]
    #[tokio::test]
    async fn paging_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let backend = sled_backend(dir.path());
        {
            let store = Arc::new(PagingStateStore::new("test", backend.clone()));
            let mut pager = Pager::new(
                "users",
                USER_TYPE,
                CountingTransport::new(user_transport(500)),
                store,
                PagerConfig::default(),
            );
            pager.refresh().await.unwrap();
            pager.set_page_size(50).await.unwrap();
            pager.set_page(3).await.unwrap();
        }

        let store = Arc::new(PagingStateStore::new("test", backend));
        let pager = Pager::new(
            "users",
            USER_TYPE,
            CountingTransport::new(user_transport(500)),
            store,
            PagerConfig::default(),
        );
        assert_eq!(pager.state().page, 3);
        assert_eq!(pager.state().page_size, 50);
    }

    // Scenario: Sort while paused, then unpause and refresh.
    // Expected Outcome: No call while paused; exactly one call afterwards,
    // carrying the new sort.
    #[traced_test]
    #[tokio::test]
    async fn pause_suppresses_fetches() {
        let transport = CountingTransport::new(user_transport(20));
        let config = PagerConfig {
            start_paused: true,
            ..PagerConfig::default()
        };
        let mut pager = Pager::new(
            "users",
            USER_TYPE,
            transport.clone(),
            Arc::new(PagingStateStore::in_memory()),
            config,
        );

        let outcome = pager.set_sort_key("status").await.unwrap();
        assert_eq!(outcome, FetchOutcome::Paused);
        assert_eq!(pager.state().sort_key, "status");
        assert_eq!(transport.calls(), 0);

        pager.set_is_paused(false);
        pager.refresh().await.unwrap();
        assert_eq!(transport.calls(), 1);
        let query = transport.last_query().unwrap();
        assert_eq!(query.sort_key, "status");
        assert_eq!(query.sort_order, SortOrder::Asc);
    }

    // Scenario: The on-disk record for a pager is not valid JSON.
    // Expected Outcome: The pager starts from defaults and the bad record is
    // replaced by a readable one.
    #[traced_test]
    #[tokio::test]
    async fn corrupt_record_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let backend = sled_backend(dir.path());
        backend.put("test:users", "{not json").unwrap();

        let store = Arc::new(PagingStateStore::new("test", backend.clone()));
        let pager = Pager::new(
            "users",
            USER_TYPE,
            CountingTransport::new(user_transport(5)),
            store.clone(),
            PagerConfig::default(),
        );

        assert_eq!(pager.state().page, 1);
        assert_eq!(pager.state().page_size, PagerDefaults::default().page_size);
        assert!(logs_contain("Discarding unreadable pager state"));
        assert!(store.load("users").unwrap().is_some());
    }

    // Scenario: Typed filter input flows through the debouncer into a pager
    // backed by a JSON document.
    // Expected Outcome: One fetch for the whole burst of keystrokes, and the
    // cache holds only matching users.
    #[traced_test]
    #[tokio::test(start_paused = true)]
    async fn debounced_input_drives_filtered_fetches() {
        let document = serde_json::json!({ "User": users(30) });
        let transport =
            CountingTransport::new(JsonFileTransport::from_json(document).unwrap());
        let cache = ObjectCache::new();
        let mut pager = Pager::new(
            "users",
            USER_TYPE,
            transport.clone(),
            Arc::new(PagingStateStore::in_memory()),
            PagerConfig::default(),
        )
        .with_consumer(cache.clone());
        pager
            .activate_filter_elements(&[FilterControl::text("name")])
            .await
            .unwrap();

        let (tx, mut debouncer) = FilterInputDebouncer::channel(16, Duration::from_millis(300));
        for partial in ["u", "us", "user-02"] {
            tx.send(FilterInput::Keystroke("name".into(), partial.into()))
                .await
                .unwrap();
        }
        drop(tx);

        let handled = pager.drive_filter_input(&mut debouncer).await;
        assert_eq!(handled, 1);
        assert_eq!(transport.calls(), 1);
        assert_eq!(pager.state().raw_result_count, Some(10));
        assert_eq!(cache.len(), 10);
        let cached: Option<Value> = cache.get("u20");
        assert!(cached.is_some());
    }
}
