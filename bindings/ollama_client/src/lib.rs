//! Client for the local model serving daemon.
//!
//! The daemon exposes an HTTP API with newline-delimited JSON streaming for generation and model
//! pulls. This crate covers the endpoints the comparator needs: streamed generate, streamed pull,
//! delete, the installed-model listing and the fire-and-forget unload signal.

mod error;
mod stream;
mod types;

pub use error::OllamaError;
pub use stream::{GenerateStream, PullStream};
pub use types::{GenerateChunk, GenerateOptions, GenerateRequest, ModelInfo, PullChunk};

use stream::NdJsonStream;
use types::ModelsResponse;
use url::Url;

/// Keep-alive value asking the daemon to hold the model in memory indefinitely.
pub const KEEP_ALIVE_HOLD: i64 = -1;

/// Keep-alive value asking the daemon to free the model immediately.
pub const KEEP_ALIVE_RELEASE: i64 = 0;

#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: Url,
}

impl OllamaClient {
    /// Create a client for the daemon at `base_url`, e.g. `http://localhost:11434`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Start a streamed generation.
    ///
    /// Returns once the response headers arrive. Chunks are then pulled one at a time from the
    /// returned stream; the final chunk has `done: true` and carries the completion statistics.
    pub async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateStream, OllamaError> {
        let response = self
            .http
            .post(self.endpoint("api/generate")?)
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(GenerateStream::new(NdJsonStream::new(response)))
    }

    /// List the models installed on the daemon.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, OllamaError> {
        let response = self.http.get(self.endpoint("api/tags")?).send().await?;
        let response = check_status(response).await?;
        let body: ModelsResponse = response.json().await?;
        Ok(body.models)
    }

    /// Start a streamed model pull.
    ///
    /// The daemon reports progress per download section; the terminal chunk has status
    /// `success`.
    pub async fn pull_stream(&self, model: &str) -> Result<PullStream, OllamaError> {
        let response = self
            .http
            .post(self.endpoint("api/pull")?)
            .json(&serde_json::json!({ "model": model, "stream": true }))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(PullStream::new(NdJsonStream::new(response)))
    }

    /// Delete a model from the daemon.
    pub async fn delete_model(&self, model: &str) -> Result<(), OllamaError> {
        let response = self
            .http
            .delete(self.endpoint("api/delete")?)
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Ask the daemon to free the resources held for `model`.
    ///
    /// This is a fire-and-forget signal sent after a run. Failures are logged and not surfaced,
    /// the daemon does not acknowledge the release.
    pub async fn unload_model(&self, model: &str) {
        let request = GenerateRequest::unload(model);
        let result = async {
            let response = self
                .http
                .post(self.endpoint("api/generate")?)
                .json(&request)
                .send()
                .await?;
            check_status(response).await?;
            Ok::<_, OllamaError>(())
        }
        .await;

        if let Err(e) = result {
            log::warn!("Failed to send unload signal for model {}: {}", model, e);
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, OllamaError> {
        Ok(self.base_url.join(path)?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, OllamaError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<types::ApiErrorBody>(&body) {
        Ok(body) => body.error,
        Err(_) => body,
    };

    Err(OllamaError::Api {
        message: if message.trim().is_empty() {
            format!("daemon returned status {status}")
        } else {
            message
        },
    })
}
