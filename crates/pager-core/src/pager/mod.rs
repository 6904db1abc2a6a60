use crate::{
    cache::{ObjectCache, ResultConsumer},
    error::PagerError,
    event_bus::EventBus,
    state::paging::PagingStateStore,
};
use connectors::transport::Transport;
use model::{
    events::{PageClamped, PageLoaded},
    pagination::{
        filter::FilterMap,
        page::{FetchResult, PageQuery},
        state::{PagerDefaults, PagerState, page_count_for},
    },
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

pub mod debounce;
pub mod filters;

#[derive(Debug, Clone, Default)]
pub struct PagerConfig {
    pub defaults: PagerDefaults,
    pub start_paused: bool,
    /// Upper bound for one transport call. `None` waits forever.
    pub fetch_timeout: Option<Duration>,
    /// Filters pinned for the lifetime of the pager.
    pub forced_filters: FilterMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerStatus {
    Paused,
    Idle,
    Fetching,
}

/// What one applied fetch result looked like.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSummary {
    pub seq: u64,
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub raw_result_count: u64,
    pub item_count: usize,
    /// Page the pager was on before the result pulled it back into range.
    pub clamped_from: Option<u32>,
    pub took_ms: u128,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched(PageSummary),
    /// State changed, but the pager is paused so nothing was requested.
    Paused,
    /// The operation did not change any state.
    Unchanged,
}

impl FetchOutcome {
    pub fn summary(&self) -> Option<&PageSummary> {
        match self {
            FetchOutcome::Fetched(summary) => Some(summary),
            _ => None,
        }
    }
}

/// Drives one paginated, sortable, filterable view over a collection type.
///
/// Every state change is written through to the store and, unless paused,
/// turns into exactly one transport call. Calls take `&mut self`, so a pager
/// never has two fetches in flight and results apply in issue order.
pub struct Pager {
    state: PagerState,
    transport: Arc<dyn Transport>,
    store: Arc<PagingStateStore>,
    consumer: Box<dyn ResultConsumer>,
    bus: Option<EventBus>,
    paused: bool,
    fetching: bool,
    fetch_timeout: Option<Duration>,
    seq: u64,
}

impl Pager {
    pub fn new(
        id: &str,
        collection_type: &str,
        transport: Arc<dyn Transport>,
        store: Arc<PagingStateStore>,
        config: PagerConfig,
    ) -> Self {
        let mut state = store.initialize(id, collection_type, &config.defaults);
        if !config.forced_filters.is_empty() {
            store.force_add_filters(&mut state, config.forced_filters);
        }

        debug!(
            pager_id = %id,
            collection = %collection_type,
            page = state.page,
            page_size = state.page_size,
            transport = transport.name(),
            "Pager created"
        );

        Pager {
            state,
            transport,
            store,
            consumer: Box::new(ObjectCache::new()),
            bus: None,
            paused: config.start_paused,
            fetching: false,
            fetch_timeout: config.fetch_timeout,
            seq: 0,
        }
    }

    pub fn with_consumer(mut self, consumer: impl ResultConsumer + 'static) -> Self {
        self.consumer = Box::new(consumer);
        self
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn state(&self) -> &PagerState {
        &self.state
    }

    pub fn status(&self) -> PagerStatus {
        if self.fetching {
            PagerStatus::Fetching
        } else if self.paused {
            PagerStatus::Paused
        } else {
            PagerStatus::Idle
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pausing only stops new fetches from being issued.
    pub fn set_is_paused(&mut self, paused: bool) {
        if self.paused != paused {
            debug!(pager_id = %self.state.id, paused, "Pager pause toggled");
        }
        self.paused = paused;
    }

    /// Same key flips the direction; a new key sorts ascending from page 1.
    pub async fn set_sort_key(&mut self, key: &str) -> Result<FetchOutcome, PagerError> {
        if self.state.sort_key == key {
            self.state.sort_order = self.state.sort_order.toggled();
        } else {
            self.state.sort_key = key.to_string();
            self.state.sort_order = Default::default();
            self.state.page = 1;
        }
        self.store.persist(&self.state);
        self.fetch().await
    }

    pub async fn refresh(&mut self) -> Result<FetchOutcome, PagerError> {
        self.fetch().await
    }

    /// Moves to `page`. Pages past the last known page are rejected.
    pub async fn set_page(&mut self, page: u32) -> Result<FetchOutcome, PagerError> {
        if page < 1 {
            return Err(PagerError::invalid("page", page, "must be at least 1"));
        }
        if self.state.raw_result_count.is_some() && page > self.state.page_count {
            return Err(PagerError::invalid(
                "page",
                page,
                format!("only {} page(s) available", self.state.page_count),
            ));
        }
        if page == self.state.page {
            return Ok(FetchOutcome::Unchanged);
        }

        self.state.page = page;
        self.store.persist(&self.state);
        self.fetch().await
    }

    /// Parses raw page-number input; anything unparsable leaves state alone.
    pub async fn set_page_input(&mut self, input: &str) -> Result<FetchOutcome, PagerError> {
        let page = parse_positive("page", input)?;
        self.set_page(page).await
    }

    pub async fn set_page_size(&mut self, page_size: u32) -> Result<FetchOutcome, PagerError> {
        if page_size < 1 {
            return Err(PagerError::invalid("page size", page_size, "must be at least 1"));
        }
        if page_size == self.state.page_size {
            return Ok(FetchOutcome::Unchanged);
        }

        self.state.page_size = page_size;
        if let Some(raw) = self.state.raw_result_count {
            self.state.page_count = page_count_for(raw, page_size);
        }
        self.store.persist(&self.state);
        self.fetch().await
    }

    pub async fn set_page_size_input(&mut self, input: &str) -> Result<FetchOutcome, PagerError> {
        let page_size = parse_positive("page size", input)?;
        self.set_page_size(page_size).await
    }

    /// Until a result count is known the next page is taken on trust, the
    /// same way `set_page` accepts it.
    pub async fn next_page(&mut self) -> Result<FetchOutcome, PagerError> {
        if self.state.raw_result_count.is_some() && self.state.page >= self.state.page_count {
            return Ok(FetchOutcome::Unchanged);
        }
        self.set_page(self.state.page + 1).await
    }

    pub async fn previous_page(&mut self) -> Result<FetchOutcome, PagerError> {
        if self.state.page <= 1 {
            return Ok(FetchOutcome::Unchanged);
        }
        self.set_page(self.state.page - 1).await
    }

    pub async fn first_page(&mut self) -> Result<FetchOutcome, PagerError> {
        self.set_page(1).await
    }

    /// Fetches the current page first when the page count is not known yet.
    /// A paused pager without a count stays where it is.
    pub async fn last_page(&mut self) -> Result<FetchOutcome, PagerError> {
        let refreshed = match self.state.raw_result_count {
            Some(_) => None,
            None => match self.fetch().await? {
                fetched @ FetchOutcome::Fetched(_) => Some(fetched),
                _ => return Ok(FetchOutcome::Unchanged),
            },
        };

        match self.set_page(self.state.page_count).await? {
            FetchOutcome::Unchanged => Ok(refreshed.unwrap_or(FetchOutcome::Unchanged)),
            moved => Ok(moved),
        }
    }

    /// The filters actually sent to the transport.
    pub fn get_non_empty_filter_attributes(&self) -> FilterMap {
        self.state.non_empty_filters()
    }

    pub fn exact_match(&self) -> bool {
        self.state.exact_match()
    }

    async fn fetch(&mut self) -> Result<FetchOutcome, PagerError> {
        if self.paused {
            debug!(pager_id = %self.state.id, "Pager paused, fetch suppressed");
            return Ok(FetchOutcome::Paused);
        }

        self.seq += 1;
        let seq = self.seq;
        let query = PageQuery::from_state(&self.state);

        debug!(
            pager_id = %self.state.id,
            seq,
            page = query.page,
            page_size = query.page_size,
            sort = %query.sort_key,
            order = %query.sort_order,
            filters = ?query.filters,
            exact = query.exact,
            "Fetching page"
        );

        self.fetching = true;
        let result = match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.fetch(&query))
                .await
                .map_err(|_| PagerError::Timeout(limit))
                .and_then(|r| r.map_err(PagerError::from)),
            None => self.transport.fetch(&query).await.map_err(PagerError::from),
        };
        self.fetching = false;

        match result {
            Ok(result) => Ok(FetchOutcome::Fetched(self.apply_result(seq, result).await)),
            Err(e) => {
                warn!(pager_id = %self.state.id, seq, error = %e, "Fetch failed");
                Err(e)
            }
        }
    }

    /// Applies one transport result: page-count bookkeeping, clamping and
    /// delivery. Clamping persists but never fetches again.
    async fn apply_result(&mut self, seq: u64, result: FetchResult) -> PageSummary {
        let clamped_from = self.state.apply_result_count(result.raw_result_count);

        if let Some(from) = clamped_from {
            info!(
                pager_id = %self.state.id,
                from,
                to = self.state.page,
                "Page out of range, clamped"
            );
            self.store.persist(&self.state);
            if let Some(bus) = &self.bus {
                bus.publish(PageClamped {
                    pager_id: self.state.id.clone(),
                    from,
                    to: self.state.page,
                    timestamp: chrono::Utc::now(),
                })
                .await;
            }
        }

        self.consumer.consume(&result.items);

        let summary = PageSummary {
            seq,
            page: self.state.page,
            page_size: self.state.page_size,
            page_count: self.state.page_count,
            raw_result_count: result.raw_result_count,
            item_count: result.item_count(),
            clamped_from,
            took_ms: result.took_ms,
        };

        debug!(
            pager_id = %self.state.id,
            seq,
            items = summary.item_count,
            raw_result_count = summary.raw_result_count,
            page_count = summary.page_count,
            took_ms = %summary.took_ms,
            "Page loaded"
        );

        if let Some(bus) = &self.bus {
            bus.publish(PageLoaded {
                pager_id: self.state.id.clone(),
                seq,
                page: summary.page,
                page_count: summary.page_count,
                raw_result_count: summary.raw_result_count,
                item_count: summary.item_count,
                timestamp: chrono::Utc::now(),
            })
            .await;
        }

        summary
    }
}

fn parse_positive(field: &'static str, input: &str) -> Result<u32, PagerError> {
    match input.trim().parse::<u32>() {
        Ok(value) if value >= 1 => Ok(value),
        Ok(value) => Err(PagerError::invalid(field, value, "must be at least 1")),
        Err(e) => Err(PagerError::invalid(field, input, e.to_string())),
    }
}
