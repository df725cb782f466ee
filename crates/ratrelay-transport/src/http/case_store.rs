//! Case persistence over HTTP.

use async_trait::async_trait;
use ratrelay_core::{Case, CaseStore, PersistError, PersistResult};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use super::api::{ApiClient, response_data};

/// [`CaseStore`] backed by the rescue API.
///
/// Saved cases go to `PUT /rescues/{id}`, unsaved ones to `POST /rescues`.
#[derive(Debug, Clone)]
pub struct HttpCaseStore {
    api: ApiClient,
}

impl HttpCaseStore {
    /// Creates a store on top of `api`.
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CaseStore for HttpCaseStore {
    async fn save(&self, case: Case) -> PersistResult<Case> {
        let (method, path) = match &case.id {
            Some(id) => (Method::PUT, format!("/rescues/{id}")),
            None => (Method::POST, "/rescues".to_string()),
        };
        let body = serde_json::to_value(&case)?;
        let response = self.api.call(method, &path, Some(&body)).await?;
        let data = response_data(&response).ok_or(PersistError::UnusableResponse)?;

        let mut saved = case;
        saved.merge(data)?;
        debug!(case_id = ?saved.id, "API accepted case");
        Ok(saved)
    }

    async fn open_cases(&self) -> PersistResult<Vec<Case>> {
        let response = self.api.call(Method::GET, "/rescues?open=true", None).await?;
        let items = response
            .get("data")
            .and_then(Value::as_array)
            .ok_or(PersistError::UnusableResponse)?;

        let cases = items
            .iter()
            .filter_map(|item| match serde_json::from_value::<Case>(item.clone()) {
                Ok(case) => Some(case),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable case");
                    None
                }
            })
            .collect();
        Ok(cases)
    }
}
