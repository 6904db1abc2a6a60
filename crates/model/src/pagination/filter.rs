use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// A single filter value as stored in pager state and sent to a transport.
///
/// `Null` and an empty `Text` both mean "no filter on this attribute".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(untagged)]
pub enum FilterValue {
    #[default]
    Null,
    Bool(bool),
    Text(String),
}

/// Attribute name -> filter value. Ordered so persisted records are stable.
pub type FilterMap = BTreeMap<String, FilterValue>;

impl FilterValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Null => true,
            FilterValue::Text(s) => s.is_empty(),
            FilterValue::Bool(_) => false,
        }
    }

    /// Parses a command-line style value: `true`/`false` become booleans,
    /// everything else is text.
    pub fn parse_loose(raw: &str) -> Self {
        match raw {
            "true" => FilterValue::Bool(true),
            "false" => FilterValue::Bool(false),
            "" => FilterValue::Null,
            other => FilterValue::Text(other.to_string()),
        }
    }
}

impl Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Null => Ok(()),
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// Returns only the filters that actually constrain a query.
pub fn non_empty(filters: &FilterMap) -> FilterMap {
    filters
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Text,
    Boolean,
}

/// Declaration of one live filter control bound to a pager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterControl {
    pub attribute: String,
    pub kind: FilterKind,
    pub exact: bool,
}

impl FilterControl {
    pub fn text(attribute: impl Into<String>) -> Self {
        FilterControl {
            attribute: attribute.into(),
            kind: FilterKind::Text,
            exact: false,
        }
    }

    pub fn boolean(attribute: impl Into<String>) -> Self {
        FilterControl {
            attribute: attribute.into(),
            kind: FilterKind::Boolean,
            exact: false,
        }
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }
}

/// Initial value a control should display after activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterControlValue {
    pub attribute: String,
    pub kind: FilterKind,
    pub value: FilterValue,
}

/// A committed change coming from a filter control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    /// Value committed (debounce elapsed, enter, blur or checkbox toggle).
    Commit(String, FilterValue),
    /// Escape pressed while editing: clear the filter.
    Escape(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_drops_null_and_blank_text() {
        let filters = FilterMap::from([
            ("name".to_string(), FilterValue::from("")),
            ("locale".to_string(), FilterValue::from("en")),
            ("flag".to_string(), FilterValue::Null),
        ]);

        let active = non_empty(&filters);
        assert_eq!(
            active,
            FilterMap::from([("locale".to_string(), FilterValue::from("en"))])
        );
    }

    #[test]
    fn false_is_an_active_filter() {
        assert!(!FilterValue::Bool(false).is_empty());
    }

    #[test]
    fn deserializes_mixed_json_values() {
        let filters: FilterMap =
            serde_json::from_str(r#"{"a":"x","b":true,"c":null}"#).unwrap();
        assert_eq!(filters["a"], FilterValue::Text("x".into()));
        assert_eq!(filters["b"], FilterValue::Bool(true));
        assert_eq!(filters["c"], FilterValue::Null);
    }
}
