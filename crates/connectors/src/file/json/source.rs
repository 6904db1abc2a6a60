use crate::{error::TransportError, eval::evaluate, transport::Transport};
use async_trait::async_trait;
use model::pagination::page::{FetchResult, PageQuery};
use serde_json::Value;
use std::{collections::HashMap, path::Path, time::Instant};
use tracing::{debug, info};

/// Serves pages from a JSON document loaded into memory.
///
/// The document is either an array (one collection answering every type) or
/// an object mapping collection type to an array of items.
pub struct JsonFileTransport {
    collections: HashMap<String, Vec<Value>>,
    fallback: Option<Vec<Value>>,
}

impl JsonFileTransport {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let transport = Self::from_json(serde_json::from_str(&content)?)?;
        info!(
            path = %path.display(),
            collections = transport.collections.len(),
            "Loaded JSON data file"
        );
        Ok(transport)
    }

    pub fn from_json(document: Value) -> Result<Self, TransportError> {
        match document {
            Value::Array(items) => Ok(JsonFileTransport {
                collections: HashMap::new(),
                fallback: Some(items),
            }),
            Value::Object(map) => {
                let mut collections = HashMap::with_capacity(map.len());
                for (name, value) in map {
                    match value {
                        Value::Array(items) => {
                            collections.insert(name, items);
                        }
                        other => {
                            return Err(TransportError::InvalidResponse(format!(
                                "collection '{name}' must be an array, got {other}"
                            )));
                        }
                    }
                }
                Ok(JsonFileTransport {
                    collections,
                    fallback: None,
                })
            }
            other => Err(TransportError::InvalidResponse(format!(
                "expected a JSON array or object, got {other}"
            ))),
        }
    }

    fn items_for(&self, collection_type: &str) -> Result<&[Value], TransportError> {
        self.collections
            .get(collection_type)
            .or(self.fallback.as_ref())
            .map(Vec::as_slice)
            .ok_or_else(|| TransportError::UnknownCollection(collection_type.to_string()))
    }
}

#[async_trait]
impl Transport for JsonFileTransport {
    async fn fetch(&self, query: &PageQuery) -> Result<FetchResult, TransportError> {
        let start = Instant::now();
        let items = self.items_for(&query.collection_type)?;
        let (page, raw_result_count) = evaluate(items, query);

        debug!(
            collection = %query.collection_type,
            page = query.page,
            returned = page.len(),
            raw_result_count,
            "Evaluated query against JSON data"
        );

        Ok(FetchResult {
            items: page,
            raw_result_count,
            took_ms: start.elapsed().as_millis(),
        })
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}
