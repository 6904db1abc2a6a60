use crate::{error::TransportError, transport::Transport};
use async_trait::async_trait;
use model::pagination::page::{FetchResult, PageQuery};
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

/// Fetches pages over HTTP from a REST endpoint per collection type.
#[derive(Clone)]
pub struct RestTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

#[derive(Deserialize)]
struct RestResponse {
    #[serde(default)]
    result: Value,
    result_count: Option<u64>,
}

impl RestTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        RestTransport {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            user: user.into(),
            password: password.into(),
        });
        self
    }

    pub fn collection_url(&self, collection_type: &str) -> String {
        format!("{}/{}", self.base_url, collection_type)
    }

    /// Query string for one page: paging and sort parameters, one parameter
    /// per active filter, and `loose=1` unless exact matching was asked for.
    pub fn query_params(query: &PageQuery) -> Vec<(String, String)> {
        let mut params = vec![
            ("sort".to_string(), query.sort_key.clone()),
            ("order".to_string(), query.sort_order.to_string()),
            ("pageSize".to_string(), query.page_size.to_string()),
            ("page".to_string(), query.page.to_string()),
        ];

        if !query.exact {
            params.push(("loose".to_string(), "1".to_string()));
        }

        for (attr, value) in &query.filters {
            if !value.is_empty() {
                params.push((attr.clone(), value.to_string()));
            }
        }

        params
    }

    fn parse_body(body: RestResponse) -> Result<(Vec<Value>, u64), TransportError> {
        let items = match body.result {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single @ Value::Object(_) => vec![single],
            other => {
                return Err(TransportError::InvalidResponse(format!(
                    "expected 'result' to be an array, got {other}"
                )));
            }
        };
        let count = body.result_count.unwrap_or(items.len() as u64);
        Ok((items, count))
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn fetch(&self, query: &PageQuery) -> Result<FetchResult, TransportError> {
        let start = Instant::now();
        let url = self.collection_url(&query.collection_type);
        let params = Self::query_params(query);

        debug!(url = %url, params = ?params, "Fetching page over REST");

        let mut request = self.client.get(&url).query(&params);
        if let Some(creds) = &self.credentials {
            request = request
                .header("X-User", &creds.user)
                .header("X-Password", &creds.password);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: RestResponse = response.json().await?;
        let (items, raw_result_count) = Self::parse_body(body)?;

        Ok(FetchResult {
            items,
            raw_result_count,
            took_ms: start.elapsed().as_millis(),
        })
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
