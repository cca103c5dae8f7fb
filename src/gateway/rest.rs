//! REST implementation of the persistence gateway.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use super::records::{EdgeRecord, MutationResponse, NodeRecord, NodeUpdateBody};
use super::traits::PersistenceGateway;

/// HTTP client for the durable store's CRUD API.
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
}

impl RestGateway {
    /// Create a gateway targeting the given base URL
    /// (e.g. `http://localhost:4000/api`).
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(&self, response: reqwest::Response, what: &str) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            warn!(%status, what, "store request failed");
            anyhow::bail!("{} failed with status {}", what, status);
        }
        let body: MutationResponse = response
            .json()
            .await
            .with_context(|| format!("{}: malformed store response", what))?;
        body.into_result()
    }
}

#[async_trait]
impl PersistenceGateway for RestGateway {
    async fn fetch_nodes(&self) -> Result<Vec<NodeRecord>> {
        let response = self
            .client
            .get(self.url("/nodes"))
            .send()
            .await
            .context("GET /nodes failed")?
            .error_for_status()
            .context("GET /nodes returned an error status")?;
        response.json().await.context("GET /nodes: malformed body")
    }

    async fn fetch_edges(&self) -> Result<Vec<EdgeRecord>> {
        let response = self
            .client
            .get(self.url("/edges"))
            .send()
            .await
            .context("GET /edges failed")?
            .error_for_status()
            .context("GET /edges returned an error status")?;
        response.json().await.context("GET /edges: malformed body")
    }

    async fn create_node(&self, record: &NodeRecord) -> Result<()> {
        let response = self
            .client
            .post(self.url("/nodes"))
            .json(record)
            .send()
            .await
            .context("POST /nodes failed")?;
        self.check(response, "create node").await
    }

    async fn update_node(&self, record: &NodeRecord) -> Result<()> {
        let response = self
            .client
            .put(self.url(&format!("/nodes/{}", record.id)))
            .json(&NodeUpdateBody::from_record(record))
            .send()
            .await
            .context("PUT /nodes/:id failed")?;
        self.check(response, "update node").await
    }

    async fn delete_node(&self, id: Uuid) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/nodes/{}", id)))
            .send()
            .await
            .context("DELETE /nodes/:id failed")?;
        self.check(response, "delete node").await
    }

    async fn create_edge(&self, record: &EdgeRecord) -> Result<()> {
        let response = self
            .client
            .post(self.url("/edges"))
            .json(record)
            .send()
            .await
            .context("POST /edges failed")?;
        self.check(response, "create edge").await
    }

    async fn delete_edge(&self, id: Uuid) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/edges/{}", id)))
            .send()
            .await
            .context("DELETE /edges/:id failed")?;
        self.check(response, "delete edge").await
    }
}
