//! Local evaluation of a page query over an in-memory collection.
//!
//! Shared by the JSON file transport and the message-serving helper so both
//! answer queries the same way a server would.

use model::pagination::{
    filter::{FilterMap, FilterValue},
    page::PageQuery,
    sort::SortOrder,
};
use serde_json::Value;
use std::cmp::Ordering;

/// Filters, sorts and slices `items`. Returns the page and the total number
/// of matching items.
pub fn evaluate(items: &[Value], query: &PageQuery) -> (Vec<Value>, u64) {
    let mut matching: Vec<&Value> = items
        .iter()
        .filter(|item| matches_filters(item, &query.filters, query.exact))
        .collect();

    matching.sort_by(|a, b| compare_by_key(a, b, &query.sort_key, query.sort_order));

    let total = matching.len() as u64;
    let page = matching
        .into_iter()
        .skip(query.offset())
        .take(query.page_size as usize)
        .cloned()
        .collect();

    (page, total)
}

pub fn matches_filters(item: &Value, filters: &FilterMap, exact: bool) -> bool {
    filters.iter().all(|(attr, wanted)| {
        let field = item.get(attr).unwrap_or(&Value::Null);
        match wanted {
            FilterValue::Null => true,
            FilterValue::Bool(b) => field.as_bool() == Some(*b),
            FilterValue::Text(t) if t.is_empty() => true,
            FilterValue::Text(t) => match field_text(field) {
                Some(text) if exact => text == *t,
                Some(text) => text.to_lowercase().contains(&t.to_lowercase()),
                None => false,
            },
        }
    })
}

fn field_text(field: &Value) -> Option<String> {
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Orders two items by `key`. Items without the key sort last in either
/// direction.
fn compare_by_key(a: &Value, b: &Value, key: &str, order: SortOrder) -> Ordering {
    let left = a.get(key).filter(|v| !v.is_null());
    let right = b.get(key).filter(|v| !v.is_null());

    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => {
            let ord = compare_values(l, r);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }
    }
}

fn compare_values(l: &Value, r: &Value) -> Ordering {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => type_rank(l).cmp(&type_rank(r)),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
