//! Name lookups over HTTP, cached in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use ratrelay_core::{NameResolver, UNKNOWN_NAME};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::api::{ApiClient, response_data};

/// [`NameResolver`] backed by the rescue API.
///
/// Successful lookups are cached until [`flush`](NameResolver::flush);
/// failures are retried on the next request.
#[derive(Debug)]
pub struct HttpNameResolver {
    api: ApiClient,
    rats: Mutex<HashMap<String, String>>,
    clients: Mutex<HashMap<String, String>>,
}

impl HttpNameResolver {
    /// Creates a resolver on top of `api`.
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            rats: Mutex::new(HashMap::new()),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Looks `id` up under `path`, reading `field` from the response data.
    async fn lookup(
        &self,
        cache: &Mutex<HashMap<String, String>>,
        path: &str,
        field: &str,
        id: Option<&str>,
    ) -> String {
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty() && *id != "0") else {
            return UNKNOWN_NAME.to_string();
        };
        if let Some(name) = cache.lock().get(id).cloned() {
            return name;
        }

        let response = match self.api.call(Method::GET, &format!("{path}/{id}"), None).await {
            Ok(response) => response,
            Err(e) => {
                warn!(id = %id, path = %path, error = %e, "Name lookup failed");
                return UNKNOWN_NAME.to_string();
            }
        };
        let Some(name) = response_data(&response)
            .and_then(|data| data.get(field))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
        else {
            warn!(id = %id, path = %path, field = %field, "Name missing from API response");
            return UNKNOWN_NAME.to_string();
        };

        debug!(id = %id, name = %name, "Resolved name");
        cache.lock().insert(id.to_string(), name.to_string());
        name.to_string()
    }
}

#[async_trait]
impl NameResolver for HttpNameResolver {
    async fn rat_name(&self, rat_id: Option<&str>) -> String {
        self.lookup(&self.rats, "/rats", "CMDRname", rat_id).await
    }

    async fn client_name(&self, rescue_id: Option<&str>) -> String {
        self.lookup(&self.clients, "/rescues", "client", rescue_id)
            .await
    }

    fn flush(&self) {
        self.rats.lock().clear();
        self.clients.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer) -> HttpNameResolver {
        HttpNameResolver::new(ApiClient::new(server.uri(), None, Duration::from_secs(5)).unwrap())
    }

    #[tokio::test]
    async fn test_rat_name_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rats/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "CMDRname": "Ratty", "platform": "pc" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let names = resolver(&server);
        assert_eq!(names.rat_name(Some("r1")).await, "Ratty");
        assert_eq!(names.rat_name(Some("r1")).await, "Ratty");
    }

    #[tokio::test]
    async fn test_flush_forgets_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rescues/c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "client": "Ada" }]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let names = resolver(&server);
        assert_eq!(names.client_name(Some("c1")).await, "Ada");
        names.flush();
        assert_eq!(names.client_name(Some("c1")).await, "Ada");
    }

    #[tokio::test]
    async fn test_failures_read_unknown_and_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rats/r404"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let names = resolver(&server);
        assert_eq!(names.rat_name(Some("r404")).await, UNKNOWN_NAME);
        assert_eq!(names.rat_name(Some("r404")).await, UNKNOWN_NAME);
    }

    #[tokio::test]
    async fn test_missing_id_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let names = resolver(&server);
        assert_eq!(names.rat_name(None).await, UNKNOWN_NAME);
        assert_eq!(names.client_name(Some("")).await, UNKNOWN_NAME);
        assert_eq!(names.rat_name(Some("0")).await, UNKNOWN_NAME);
    }
}
