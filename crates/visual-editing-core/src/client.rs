use serde::Deserialize;
use serde_json::Value;
use smol_str::SmolStr;

use crate::config::OverlayConfig;
use crate::error::VisualEditingError;
use crate::messages::Perspective;
use crate::type_resolver::{ProjectionFetcher, ProjectionQuery};

/// Projection queries over the content store's HTTP query endpoint.
#[derive(Debug, Clone)]
pub struct HttpProjectionClient {
    pub client: reqwest::Client,
    host: String,
    api_version: SmolStr,
    dataset: SmolStr,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

impl HttpProjectionClient {
    pub fn new(host: impl Into<String>, api_version: impl Into<SmolStr>, dataset: impl Into<SmolStr>) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            dataset: dataset.into(),
        }
    }

    /// Build a client from overlay options. Needs a dataset and either an
    /// API host or a project id.
    pub fn from_config(config: &OverlayConfig) -> Result<Self, VisualEditingError> {
        let host = config.resolved_api_host().ok_or_else(|| {
            VisualEditingError::Config("apiHost or projectId is required for type queries".into())
        })?;
        let dataset = config
            .dataset
            .clone()
            .ok_or_else(|| VisualEditingError::Config("dataset is required for type queries".into()))?;
        Ok(Self::new(host, config.api_version.clone(), dataset))
    }

    pub fn query_url(&self) -> String {
        let version = self.api_version.trim_start_matches('v');
        format!("{}/v{}/data/query/{}", self.host, version, self.dataset)
    }

    pub fn query_params(
        query: &ProjectionQuery,
        perspective: Perspective,
    ) -> Result<Vec<(&'static str, String)>, VisualEditingError> {
        Ok(vec![
            ("query", query.query.clone()),
            ("$id", serde_json::to_string(&query.document_id)?),
            ("perspective", perspective.as_str().to_string()),
        ])
    }
}

impl ProjectionFetcher for HttpProjectionClient {
    async fn fetch(
        &self,
        query: &ProjectionQuery,
        perspective: Perspective,
    ) -> Result<Value, VisualEditingError> {
        let params = Self::query_params(query, perspective)?;
        tracing::debug!(document = %query.document_id, paths = query.paths.len(), "type query");
        let response = self
            .client
            .get(self.query_url())
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        let body: QueryResponse = response.json().await?;
        Ok(body.result)
    }
}
