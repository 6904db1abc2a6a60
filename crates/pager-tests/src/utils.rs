use async_trait::async_trait;
use connectors::{
    error::TransportError,
    message::{MessageTransport, serve_collection},
    transport::Transport,
};
use model::pagination::page::{FetchResult, PageQuery};
use pager_core::state::{paging::PagingStateStore, sled_store::SledBackend};
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

pub const USER_TYPE: &str = "User";

/// `count` users named `user-000`, `user-001`, ... with every third one an
/// admin.
pub fn users(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            json!({
                "id": format!("u{i}"),
                "name": format!("user-{i:03}"),
                "isAdmin": i % 3 == 0,
                "status": if i % 2 == 0 { "active" } else { "blocked" },
            })
        })
        .collect()
}

/// Message transport answered by a background task serving `users(count)`.
pub fn user_transport(count: usize) -> MessageTransport {
    let (transport, requests) = MessageTransport::channel(16);
    let collections = HashMap::from([(USER_TYPE.to_string(), users(count))]);
    tokio::spawn(serve_collection(requests, collections));
    transport
}

/// Wraps a transport and counts the calls going through it.
pub struct CountingTransport<T> {
    inner: T,
    calls: AtomicUsize,
    last: std::sync::Mutex<Option<PageQuery>>,
}

impl<T: Transport> CountingTransport<T> {
    pub fn new(inner: T) -> Arc<Self> {
        Arc::new(CountingTransport {
            inner,
            calls: AtomicUsize::new(0),
            last: std::sync::Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<PageQuery> {
        self.last.lock().ok().and_then(|q| q.clone())
    }
}

#[async_trait]
impl<T: Transport> Transport for CountingTransport<T> {
    async fn fetch(&self, query: &PageQuery) -> Result<FetchResult, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last.lock() {
            *last = Some(query.clone());
        }
        self.inner.fetch(query).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

pub fn sled_backend(dir: &Path) -> Arc<SledBackend> {
    Arc::new(SledBackend::open(dir).expect("open sled backend"))
}

pub fn sled_store(dir: &Path) -> Arc<PagingStateStore> {
    Arc::new(PagingStateStore::new("test", sled_backend(dir)))
}
