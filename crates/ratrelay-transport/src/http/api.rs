//! Thin JSON client for the rescue API.

use std::time::Duration;

use ratrelay_core::{PersistError, PersistResult};
use reqwest::{Client, ClientBuilder, Method};
use serde_json::{Map, Value};
use tracing::debug;

/// Bearer-authenticated JSON client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> PersistResult<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| PersistError::Request(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// The API base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls `path` (which starts with `/`) and returns the JSON body.
    pub async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> PersistResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Calling API");

        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| PersistError::Request(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PersistError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json()
            .await
            .map_err(|e| PersistError::Request(e.to_string()))
    }
}

/// The `data` object of an API response.
///
/// A list answer yields its first element. A missing, empty or non-object
/// `data` yields `None`.
pub(crate) fn response_data(body: &Value) -> Option<&Map<String, Value>> {
    let data = match body.get("data")? {
        Value::Array(items) => items.first()?,
        other => other,
    };
    data.as_object().filter(|fields| !fields.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_data_shapes() {
        assert!(response_data(&json!({ "data": { "id": "1" } })).is_some());
        assert!(response_data(&json!({ "data": [{ "id": "1" }, { "id": "2" }] })).is_some());
        assert!(response_data(&json!({ "data": [] })).is_none());
        assert!(response_data(&json!({ "data": {} })).is_none());
        assert!(response_data(&json!({ "data": null })).is_none());
        assert!(response_data(&json!({ "errors": [] })).is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = ApiClient::new("http://api.local/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(api.base_url(), "http://api.local");
    }
}
