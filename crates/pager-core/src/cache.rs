use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use tracing::debug;

/// Receives the items of every completed fetch.
pub trait ResultConsumer: Send {
    fn consume(&mut self, items: &[Value]);
}

impl<F> ResultConsumer for F
where
    F: FnMut(&[Value]) + Send,
{
    fn consume(&mut self, items: &[Value]) {
        self(items)
    }
}

/// Client-side object model: the latest copy of every object seen, keyed by
/// its `id`. Clones share the same map.
#[derive(Clone, Default, Debug)]
pub struct ObjectCache {
    objects: Arc<RwLock<HashMap<String, Value>>>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `object` under its id. Objects without an id are skipped.
    pub fn insert(&self, object: &Value) -> bool {
        let Some(id) = object_id(object) else {
            debug!("Skipping object without id");
            return false;
        };
        match self.objects.write() {
            Ok(mut objects) => {
                objects.insert(id, object.clone());
                true
            }
            Err(_) => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.objects.read().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultConsumer for ObjectCache {
    fn consume(&mut self, items: &[Value]) {
        for item in items {
            self.insert(item);
        }
    }
}

fn object_id(object: &Value) -> Option<String> {
    match object.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
