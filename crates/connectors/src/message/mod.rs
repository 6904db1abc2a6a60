//! Message-based query transport.
//!
//! Queries travel as `QUERY` command messages over a channel and each one
//! carries its own reply slot, the way a socket client correlates a command
//! with its answer.

use crate::{error::TransportError, eval::evaluate, transport::Transport};
use async_trait::async_trait;
use model::pagination::{
    filter::FilterMap,
    page::{FetchResult, PageQuery},
    sort::SortOrder,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub const QUERY_COMMAND: &str = "QUERY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueryMessage {
    pub command: String,
    pub id: String,
    pub data: QueryData,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub page_size: u32,
    pub page: u32,
    pub sort: String,
    pub order: SortOrder,
    #[serde(default)]
    pub properties: FilterMap,
    #[serde(default)]
    pub exact: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryReply {
    pub result: Vec<Value>,
    pub raw_result_count: u64,
}

/// A query message paired with the slot its answer goes into.
#[derive(Debug)]
pub struct MessageRequest {
    pub message: QueryMessage,
    pub reply: oneshot::Sender<Result<QueryReply, String>>,
}

impl QueryMessage {
    pub fn from_query(id: String, query: &PageQuery) -> Self {
        QueryMessage {
            command: QUERY_COMMAND.to_string(),
            id,
            data: QueryData {
                collection_type: query.collection_type.clone(),
                page_size: query.page_size,
                page: query.page,
                sort: query.sort_key.clone(),
                order: query.sort_order,
                properties: query.filters.clone(),
                exact: query.exact,
            },
        }
    }

    pub fn to_query(&self) -> PageQuery {
        PageQuery {
            collection_type: self.data.collection_type.clone(),
            page_size: self.data.page_size,
            page: self.data.page,
            sort_key: self.data.sort.clone(),
            sort_order: self.data.order,
            filters: self.data.properties.clone(),
            exact: self.data.exact,
        }
    }
}

pub struct MessageTransport {
    sender: mpsc::Sender<MessageRequest>,
    next_id: AtomicU64,
}

impl MessageTransport {
    pub fn new(sender: mpsc::Sender<MessageRequest>) -> Self {
        MessageTransport {
            sender,
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates a transport together with the receiving end a server loop
    /// should drain.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<MessageRequest>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl Transport for MessageTransport {
    async fn fetch(&self, query: &PageQuery) -> Result<FetchResult, TransportError> {
        let start = Instant::now();
        let id = format!("query-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let message = QueryMessage::from_query(id, query);
        let (reply_tx, reply_rx) = oneshot::channel();

        debug!(message_id = %message.id, collection = %query.collection_type, "Sending query message");

        self.sender
            .send(MessageRequest {
                message,
                reply: reply_tx,
            })
            .await
            .map_err(|_| TransportError::ChannelClosed)?;

        let reply = reply_rx
            .await
            .map_err(|_| TransportError::ChannelClosed)?
            .map_err(TransportError::Rejected)?;

        Ok(FetchResult {
            items: reply.result,
            raw_result_count: reply.raw_result_count,
            took_ms: start.elapsed().as_millis(),
        })
    }

    fn name(&self) -> &'static str {
        "message"
    }
}

/// Answers query messages from in-memory collections until every sender is
/// dropped.
pub async fn serve_collection(
    mut requests: mpsc::Receiver<MessageRequest>,
    collections: HashMap<String, Vec<Value>>,
) {
    while let Some(request) = requests.recv().await {
        let answer = answer_query(&request.message, &collections);
        if request.reply.send(answer).is_err() {
            warn!(message_id = %request.message.id, "Query reply dropped, requester went away");
        }
    }
    debug!("Query message channel closed");
}

fn answer_query(
    message: &QueryMessage,
    collections: &HashMap<String, Vec<Value>>,
) -> Result<QueryReply, String> {
    if message.command != QUERY_COMMAND {
        return Err(format!("Unsupported command: {}", message.command));
    }

    let items = collections
        .get(&message.data.collection_type)
        .ok_or_else(|| format!("Unknown type: {}", message.data.collection_type))?;

    let (result, raw_result_count) = evaluate(items, &message.to_query());
    Ok(QueryReply {
        result,
        raw_result_count,
    })
}
