//! HTTP adapter for the processing backend REST API.

use crate::backend::base::{Backend, BackendError, BackendResult};
use async_trait::async_trait;
use cr_protocol::api_models::{AckResponse, HealthResponse, RunRequest, RunResponse, StatusResponse};
use cr_protocol::config_models::BackendConfig;
use cr_protocol::process_models::ProcessHandle;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Talks to the backend over HTTP with `reqwest`.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build an adapter for `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if the TLS backend or the client
    /// cannot be initialised.
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|source| BackendError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turn a response into `T`, mapping non-2xx and bad JSON to errors.
    async fn decode<T: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> BackendResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            return Err(BackendError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| BackendError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.clone(),
                source,
            })?;
        Self::decode(&url, response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&RunRequest>,
    ) -> BackendResult<T> {
        let url = self.url(path);
        debug!(%url, "POST");
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                url: url.clone(),
                source,
            })?;
        Self::decode(&url, response).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn submit_run(&self, request: &RunRequest) -> BackendResult<ProcessHandle> {
        let response: RunResponse = self
            .post(&format!("run/{}", request.node_id), Some(request))
            .await?;
        Ok(response.process_id)
    }

    async fn status(&self, handle: &ProcessHandle) -> BackendResult<StatusResponse> {
        self.get(&format!("status/{handle}")).await
    }

    async fn stop(&self, handle: &ProcessHandle) -> BackendResult<AckResponse> {
        self.post(&format!("stop/{handle}"), None).await
    }

    async fn reset(&self, handle: &ProcessHandle) -> BackendResult<AckResponse> {
        self.post(&format!("reset/{handle}"), None).await
    }

    async fn health(&self) -> BackendResult<HealthResponse> {
        self.get("health").await
    }
}
