//! HTTP client for a running batchd server

use std::time::Duration;

use eyre::{Context, Result, eyre};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::api::{IngestRequest, IngestResponse};
use crate::config::ClientConfig;
use crate::domain::{IngestionId, IngestionStatus, Priority};

/// Talks to the batchd HTTP API
pub struct BatchdClient {
    http: Client,
    base_url: String,
}

impl BatchdClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        debug!(base_url = %config.base_url, "BatchdClient::new: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit ids for ingestion and return the new ingestion id
    pub async fn submit(&self, ids: Vec<u64>, priority: Priority) -> Result<IngestionId> {
        debug!(count = ids.len(), ?priority, "BatchdClient::submit: called");
        let response = self
            .http
            .post(format!("{}/ingest", self.base_url))
            .json(&IngestRequest { ids, priority })
            .send()
            .await
            .context("Failed to reach batchd")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("Submission rejected ({}): {}", status, body));
        }

        let body: IngestResponse = response.json().await.context("Invalid submission response")?;
        Ok(body.ingestion_id)
    }

    /// Fetch ingestion status; None if the server does not know the id
    pub async fn status(&self, ingestion_id: &str) -> Result<Option<IngestionStatus>> {
        debug!(%ingestion_id, "BatchdClient::status: called");
        let response = self
            .http
            .get(format!("{}/status/{}", self.base_url, ingestion_id))
            .send()
            .await
            .context("Failed to reach batchd")?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.json().await.context("Invalid status response")?;
                Ok(Some(body))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(eyre!("Status query failed ({}): {}", status, body))
            }
        }
    }
}
